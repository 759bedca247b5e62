//! Application service: SSH readiness polling.
//!
//! Some targets boot a machine for the deployment and only accept SSH once it
//! is up. Providers call
//! [`Session::wait_for_ssh_access`](crate::application::session::Session::wait_for_ssh_access)
//! before pushing to it.

use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::ExecutionContext;
use crate::application::session::Session;
use crate::domain::format::escape;

/// Maximum number of connection attempts.
pub const SSH_CONNECT_ATTEMPTS: u32 = 30;

/// Delay between two attempts.
pub const SSH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Marker in the output of a failed attempt.
pub const PTY_FAILURE_MARKER: &str = "PTY allocation request failed";

/// Poll `host:port` until an SSH connection attempt succeeds.
///
/// # Errors
///
/// Returns the fatal `ssh_failed` error once every attempt has failed, or an
/// error if a probe cannot be run at all.
pub async fn wait_for_ssh_access<C: ExecutionContext>(
    session: &Session<'_, C>,
    host: &str,
    port: u16,
) -> Result<()> {
    let port = port.to_string();
    session.info_msg("ssh_remote_host", &[host, port.as_str()])?;

    let probe = format!("\"${{GIT_SSH:-ssh}}\" {} -p {port} 2>&1", escape(host));
    for attempt in 1..=SSH_CONNECT_ATTEMPTS {
        session.info_msg("ssh_try_connect", &[])?;
        let output = session.shell(&probe).await?;
        if attempt_succeeded(&output) {
            session.info_msg("ssh_connected", &[])?;
            return Ok(());
        }
        if attempt < SSH_CONNECT_ATTEMPTS {
            session.sleep(SSH_RETRY_DELAY).await;
        }
    }
    Err(session.error_msg("ssh_failed", &[]))
}

fn attempt_succeeded(output: &Output) -> bool {
    let text = String::from_utf8_lossy(&output.stdout);
    !text.contains(PTY_FAILURE_MARKER)
}
