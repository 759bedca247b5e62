//! Per-invocation run request derived from user input.

use crate::domain::error::DeployError;
use crate::domain::stage::Stage;

/// What the user asked a single deployment run to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Requested runnable stages; order is irrelevant.
    pub stages: Vec<Stage>,
    /// Skip working-tree cleanup (and therefore its restore).
    pub skip_cleanup: bool,
    /// Commands to run after a successful deployment.
    pub run: Vec<String>,
    /// Group stage output into log folds.
    pub fold: bool,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            stages: Stage::RUNNABLE.to_vec(),
            skip_cleanup: false,
            run: Vec::new(),
            fold: false,
        }
    }
}

impl RunRequest {
    /// Request limited to `stages`.
    #[must_use]
    pub fn with_stages(stages: &[Stage]) -> Self {
        Self {
            stages: stages.to_vec(),
            ..Self::default()
        }
    }
}

/// Parses stage names, defaulting to every runnable stage when none given.
///
/// # Errors
///
/// Returns `DeployError::UnknownStage` for a name that is not a runnable stage.
pub fn parse_stages(names: &[String]) -> Result<Vec<Stage>, DeployError> {
    if names.is_empty() {
        return Ok(Stage::RUNNABLE.to_vec());
    }
    names.iter().map(|name| name.parse()).collect()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_requests_every_runnable_stage() {
        let req = RunRequest::default();
        assert_eq!(req.stages, Stage::RUNNABLE.to_vec());
        assert!(!req.skip_cleanup);
        assert!(req.run.is_empty());
    }

    #[test]
    fn test_parse_stages_empty_means_all() {
        assert_eq!(parse_stages(&[]).expect("parse"), Stage::RUNNABLE.to_vec());
    }

    #[test]
    fn test_parse_stages_keeps_given_names() {
        let names = vec!["deploy".to_string(), "login".to_string()];
        assert_eq!(
            parse_stages(&names).expect("parse"),
            vec![Stage::Deploy, Stage::Login]
        );
    }

    #[test]
    fn test_parse_stages_rejects_finish() {
        let names = vec!["finish".to_string()];
        assert!(matches!(
            parse_stages(&names),
            Err(DeployError::UnknownStage(name)) if name == "finish"
        ));
    }
}
