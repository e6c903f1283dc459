//! Caller-supplied options, normalized against repository configuration.

use git_config::ConfigSet;

use crate::RebaseError;

const CURRENT_VERSION: u32 = 1;

/// Options accepted by [`crate::init`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub version: u32,
    pub quiet: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            quiet: false,
        }
    }
}

impl InitOptions {
    pub(crate) fn validate(&self) -> Result<(), RebaseError> {
        if self.version != CURRENT_VERSION {
            return Err(RebaseError::Unsupported("init options version mismatch"));
        }
        Ok(())
    }
}

/// Options accepted by [`crate::finish`].
#[derive(Debug, Clone)]
pub struct FinishOptions {
    pub version: u32,
    /// Notes ref to propagate the old->new commit mapping into, or `None`
    /// to disable propagation. `None` here means "not yet resolved against
    /// config"; use [`FinishOptions::resolve`] to fill it in.
    pub rewrite_notes_ref: Option<String>,
}

impl Default for FinishOptions {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            rewrite_notes_ref: None,
        }
    }
}

impl FinishOptions {
    pub(crate) fn validate(&self) -> Result<(), RebaseError> {
        if self.version != CURRENT_VERSION {
            return Err(RebaseError::Unsupported("finish options version mismatch"));
        }
        Ok(())
    }

    /// Resolve `rewrite_notes_ref` against repository configuration when
    /// the caller did not supply a non-empty value directly.
    ///
    /// `notes.rewrite.rebase` (default true) gates whether rewriting is
    /// enabled at all; when enabled, `notes.rewriteref` names the ref
    /// (absent means "no ref configured", which also disables it).
    pub(crate) fn resolve(&self, config: &ConfigSet) -> Result<Option<String>, RebaseError> {
        if let Some(ref explicit) = self.rewrite_notes_ref {
            if !explicit.is_empty() {
                return Ok(Some(explicit.clone()));
            }
        }

        if !config.get_bool_or("notes.rewrite.rebase", true)? {
            return Ok(None);
        }

        Ok(config.get_string("notes.rewriteref")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_options_default_is_current_version() {
        let opts = InitOptions::default();
        assert!(opts.validate().is_ok());
        assert!(!opts.quiet);
    }

    #[test]
    fn init_options_rejects_future_version() {
        let opts = InitOptions {
            version: CURRENT_VERSION + 1,
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(RebaseError::Unsupported(_))));
    }

    #[test]
    fn finish_options_resolve_prefers_explicit_value() {
        let config = ConfigSet::new();
        let opts = FinishOptions {
            version: CURRENT_VERSION,
            rewrite_notes_ref: Some("refs/notes/rewritten".to_string()),
        };
        assert_eq!(
            opts.resolve(&config).unwrap(),
            Some("refs/notes/rewritten".to_string())
        );
    }

    #[test]
    fn finish_options_resolve_defaults_to_none_without_config() {
        let config = ConfigSet::new();
        let opts = FinishOptions::default();
        assert_eq!(opts.resolve(&config).unwrap(), None);
    }
}
