//! Application service: build environment setup (setup before-hook).
//!
//! Every step is gated by a [`Need`]: a provider that does not declare it
//! gets no side effect from that step. The one exception is the HTTP user
//! agent, which is actively removed from child environments when not needed.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{ExecutionContext, Provider};
use crate::application::session::Session;
use crate::assets;
use crate::domain::env::{GIT_HTTP_USER_AGENT, GIT_SSH, parse_git_version, user_agent};
use crate::domain::format::escape;
use crate::domain::{Hook, Need, Vars, interpolate};

/// Private key file inside the internal directory.
pub const SSH_KEY_FILE: &str = "id_ed25519";

/// SSH wrapper file inside the internal directory.
pub const GIT_SSH_FILE: &str = "git-ssh";

/// Prepare the build environment for the deployment.
///
/// # Errors
///
/// Returns an error if the internal directory cannot be recreated, key
/// generation or wrapper setup fails, or the provider's `add_key` fails.
pub async fn setup<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
) -> Result<()> {
    session.info_msg("before_setup", &[])?;
    recreate_dir(&session.internal_dir())?;

    if session.definition().needs(Need::SshKey) {
        setup_ssh_key(provider, session).await?;
    }
    if session.definition().needs(Need::Git) {
        setup_git_config(session).await?;
    }
    setup_user_agent(session).await
}

async fn setup_ssh_key<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
) -> Result<()> {
    let dir = session.internal_dir();
    let key = dir.join(SSH_KEY_FILE);

    session.info_msg("ssh_keygen", &[])?;
    session
        .ctx()
        .ssh_keygen(session.key_name(), &key)
        .await
        .map_err(|e| session.error(format!("Failed to generate SSH key: {e:#}")))?;

    session.info_msg("setup_git_ssh", &[])?;
    let wrapper = dir.join(GIT_SSH_FILE);
    write_git_ssh(&wrapper, &key).map_err(|e| session.error(format!("{e:#}")))?;
    session.env_mut().set(GIT_SSH, wrapper.to_string_lossy());
    session.set_ssh_key(key.clone());

    if session.definition().implements(Hook::AddKey) {
        provider.add_key(&key.with_extension("pub"), session).await?;
    }
    Ok(())
}

/// Fill in a committer identity if the checkout has none.
async fn setup_git_config<C: ExecutionContext>(session: &Session<'_, C>) -> Result<()> {
    for (key, value) in [
        ("user.email", "\"$(whoami)@localhost\""),
        ("user.name", "\"$(whoami)\""),
    ] {
        session
            .shell(&format!(
                "git config {key} >/dev/null 2>&1 || git config {key} {value}"
            ))
            .await?;
    }
    Ok(())
}

async fn setup_user_agent<C: ExecutionContext>(session: &mut Session<'_, C>) -> Result<()> {
    if !session.definition().needs(Need::GitHttpUserAgent) {
        session.env_mut().unset(GIT_HTTP_USER_AGENT);
        return Ok(());
    }
    session.info_msg("setup_git_ua", &[])?;
    let output = session.shell("git --version").await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let agent = user_agent(parse_git_version(&stdout));
    session.env_mut().set(GIT_HTTP_USER_AGENT, agent);
    Ok(())
}

fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}

/// Render the embedded wrapper for `key` and make it executable.
fn write_git_ssh(path: &Path, key: &Path) -> Result<()> {
    let template = assets::get_text_asset(GIT_SSH_FILE)?;
    let mut vars = Vars::new();
    vars.insert("key".to_string(), escape(&key.to_string_lossy()));
    let script = interpolate(template, &[], &vars)?;
    std::fs::write(path, script).with_context(|| format!("writing {}", path.display()))?;
    set_permissions(path, 0o700)
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        RecordingContext, RecordingLog, TestProvider, ok_output, session_in,
    };
    use crate::domain::{ProviderDefinition, RunRequest, Stage};

    fn provider(def: ProviderDefinition) -> TestProvider {
        TestProvider::new(def)
    }

    #[tokio::test]
    async fn test_setup_without_needs_only_recreates_dir_and_unsets_agent() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join(".skiff/stale")).expect("stale dir");
        let ctx = RecordingContext::default();
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("pages").build();
        let mut p = provider(def.clone());
        let mut session = session_in(&ctx, &log, def, RunRequest::default(), dir.path());

        setup(&mut p, &mut session).await.expect("setup");

        let internal = dir.path().join(".skiff");
        assert!(internal.is_dir());
        assert_eq!(std::fs::read_dir(&internal).expect("read").count(), 0);
        assert!(ctx.commands().is_empty());
        assert!(ctx.keygens().is_empty());
        assert!(session.env().get(GIT_SSH).is_none());
        assert!(session.env().is_unset(GIT_HTTP_USER_AGENT));
        assert!(p.calls.is_empty());
    }

    #[tokio::test]
    async fn test_setup_ssh_key_generates_key_wrapper_and_publishes_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = RecordingContext::default();
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("box")
            .needs(Need::SshKey)
            .hook(Hook::AddKey)
            .build();
        let mut p = provider(def.clone());
        let mut session = session_in(&ctx, &log, def, RunRequest::default(), dir.path());

        setup(&mut p, &mut session).await.expect("setup");

        let key = dir.path().join(".skiff/id_ed25519");
        let wrapper = dir.path().join(".skiff/git-ssh");
        let keygens = ctx.keygens();
        assert_eq!(keygens.len(), 1);
        assert_eq!(keygens[0].0, session.key_name());
        assert_eq!(keygens[0].1, key);

        let script = std::fs::read_to_string(&wrapper).expect("wrapper written");
        assert!(script.contains(&format!("-i {}", key.display())));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&wrapper).expect("meta").permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }

        let wrapper_path = wrapper.to_string_lossy().into_owned();
        assert_eq!(session.env().get(GIT_SSH), Some(wrapper_path.as_str()));
        assert_eq!(session.ssh_key(), Some(key.as_path()));
        assert_eq!(
            p.calls,
            [format!("add_key {}", dir.path().join(".skiff/id_ed25519.pub").display())]
        );
    }

    #[tokio::test]
    async fn test_setup_ssh_key_without_add_key_hook_does_not_publish() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = RecordingContext::default();
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("box").needs(Need::SshKey).build();
        let mut p = provider(def.clone());
        let mut session = session_in(&ctx, &log, def, RunRequest::default(), dir.path());

        setup(&mut p, &mut session).await.expect("setup");

        assert_eq!(ctx.keygens().len(), 1);
        assert!(p.calls.is_empty());
    }

    #[tokio::test]
    async fn test_setup_keygen_failure_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = RecordingContext::default().failing_keygen();
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("box")
            .needs(Need::SshKey)
            .hook(Hook::AddKey)
            .build();
        let mut p = provider(def.clone());
        let mut session = session_in(&ctx, &log, def, RunRequest::default(), dir.path());

        let err = setup(&mut p, &mut session).await.expect_err("keygen fails");

        assert!(err.to_string().starts_with("Failed to generate SSH key"));
        assert!(session.env().get(GIT_SSH).is_none());
        assert!(p.calls.is_empty());
    }

    #[tokio::test]
    async fn test_setup_git_sets_identity_only_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = RecordingContext::default();
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("heroku").needs(Need::Git).build();
        let mut p = provider(def.clone());
        let mut session = session_in(&ctx, &log, def, RunRequest::default(), dir.path());

        setup(&mut p, &mut session).await.expect("setup");

        assert_eq!(
            ctx.commands(),
            [
                "git config user.email >/dev/null 2>&1 || git config user.email \"$(whoami)@localhost\"",
                "git config user.name >/dev/null 2>&1 || git config user.name \"$(whoami)\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_setup_user_agent_includes_git_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = RecordingContext::default()
            .respond("git --version", ok_output(b"git version 2.43.0\n"));
        let log = RecordingLog::default();
        let def = ProviderDefinition::builder("pages")
            .needs(Need::GitHttpUserAgent)
            .stage(Stage::Deploy)
            .build();
        let mut p = provider(def.clone());
        let mut session = session_in(&ctx, &log, def, RunRequest::default(), dir.path());

        setup(&mut p, &mut session).await.expect("setup");

        let agent = session.env().get(GIT_HTTP_USER_AGENT).expect("agent set");
        assert!(agent.starts_with("skiff/"));
        assert!(agent.ends_with(" git/2.43.0"));
        assert!(log.infos().contains(&"Setting up git HTTP user agent".to_string()));
    }
}
