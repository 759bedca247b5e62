//! Application service: post-deployment commands (`--run`).

use anyhow::Result;

use crate::application::ports::{ExecutionContext, Provider};
use crate::application::session::Session;

/// Command word that triggers [`Provider::restart`] instead of a shell command.
pub const RESTART: &str = "restart";

/// Run each requested command in order. `restart` (any case) restarts the
/// deployed application; anything else goes to [`Provider::run_cmd`].
///
/// # Errors
///
/// Returns the first command error; remaining commands do not run.
pub async fn run_cmds<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
) -> Result<()> {
    let cmds = session.request().run.clone();
    for cmd in &cmds {
        if cmd.trim().eq_ignore_ascii_case(RESTART) {
            provider.restart(session).await?;
        } else {
            provider.run_cmd(cmd, session).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        BareProvider, RecordingContext, RecordingLog, TestProvider, err_output, session_with,
    };
    use crate::domain::{DeployError, ProviderDefinition, RunRequest};

    fn request(cmds: &[&str]) -> RunRequest {
        RunRequest {
            run: cmds.iter().map(|c| (*c).to_string()).collect(),
            ..RunRequest::default()
        }
    }

    #[tokio::test]
    async fn test_restart_is_matched_case_insensitively() {
        let ctx = RecordingContext::default();
        let log = RecordingLog::default();
        let mut provider = TestProvider::with_all_stages().with_restart();
        let def = provider.definition().clone();
        let mut session = session_with(&ctx, &log, def, request(&["echo hi", "RESTART"]));

        run_cmds(&mut provider, &mut session).await.expect("commands");

        assert_eq!(ctx.commands(), ["echo hi"]);
        assert_eq!(provider.calls, ["restart"]);
    }

    #[tokio::test]
    async fn test_default_restart_is_unsupported() {
        let ctx = RecordingContext::default();
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("pages")
            .display_name("GitHub Pages")
            .build();
        let mut provider = BareProvider(def.clone());
        let mut session = session_with(&ctx, &log, def, request(&["restart", "echo after"]));

        let err = run_cmds(&mut provider, &mut session)
            .await
            .expect_err("restart unsupported");

        assert_eq!(err.to_string(), "GitHub Pages does not support restart");
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::RestartUnsupported(_))
        ));
        assert!(ctx.commands().is_empty(), "later commands must not run");
    }

    #[tokio::test]
    async fn test_failing_literal_command_warns_and_continues() {
        let ctx = RecordingContext::default().respond("false", err_output(1, b""));
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("pages").build();
        let mut provider = BareProvider(def.clone());
        let mut session = session_with(&ctx, &log, def, request(&["false", "echo next"]));

        run_cmds(&mut provider, &mut session).await.expect("commands");

        assert_eq!(ctx.commands(), ["false", "echo next"]);
        assert_eq!(log.warns().len(), 1);
        assert!(log.warns()[0].starts_with("`false` exited with"));
    }
}
