//! Domain types for skiff configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use serde::{Deserialize, Serialize};

use crate::domain::request::RunRequest;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.skiff/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SkiffConfig {
    /// Defaults applied to every run.
    pub defaults: RunDefaults,
}

/// Run defaults; command-line flags can only turn these on.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RunDefaults {
    /// Group stage output into log folds.
    pub fold: bool,
    /// Never clean the working tree before deploying.
    pub skip_cleanup: bool,
}

impl SkiffConfig {
    /// Applies configured defaults to a request built from flags.
    pub fn apply(&self, request: &mut RunRequest) {
        request.fold |= self.defaults.fold;
        request.skip_cleanup |= self.defaults.skip_cleanup;
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_skiff_config_default_is_all_off() {
        let cfg = SkiffConfig::default();
        assert!(!cfg.defaults.fold);
        assert!(!cfg.defaults.skip_cleanup);
    }

    #[test]
    fn test_skiff_config_deserialize_full_yaml() {
        let yaml = "defaults:\n  fold: true\n  skip_cleanup: true\n";
        let cfg: SkiffConfig = serde_yaml::from_str(yaml).expect("valid yaml");
        assert!(cfg.defaults.fold);
        assert!(cfg.defaults.skip_cleanup);
    }

    #[test]
    fn test_skiff_config_deserialize_empty_yaml_uses_defaults() {
        let cfg: SkiffConfig = serde_yaml::from_str("{}").expect("empty yaml");
        assert_eq!(cfg, SkiffConfig::default());
    }

    #[test]
    fn test_skiff_config_deserialize_ignores_unknown_fields() {
        let yaml = "defaults:\n  fold: true\nprovider: pages\n";
        let cfg: SkiffConfig = serde_yaml::from_str(yaml).expect("valid yaml");
        assert!(cfg.defaults.fold);
    }

    #[test]
    fn test_apply_turns_on_configured_defaults() {
        let cfg = SkiffConfig {
            defaults: RunDefaults {
                fold: true,
                skip_cleanup: false,
            },
        };
        let mut req = RunRequest {
            skip_cleanup: true,
            ..RunRequest::default()
        };
        cfg.apply(&mut req);
        assert!(req.fold);
        assert!(req.skip_cleanup, "flag must not be turned off by config");
    }
}
