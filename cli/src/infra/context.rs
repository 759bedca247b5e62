//! Infrastructure implementation of the `ExecutionContext` port.
//!
//! `LocalContext` runs commands through `sh -c` on the local machine with
//! tokio, applying the session's environment overlay to each child and
//! killing children that outlive the timeout.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::application::ports::{ExecutionContext, ShellOpts};
use crate::domain::format::escape;
use crate::domain::{EnvOverlay, Package};

/// Default timeout for a single shell command.
pub const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Production `ExecutionContext`.
pub struct LocalContext {
    timeout: Duration,
    echo: bool,
}

impl LocalContext {
    /// `echo` copies each command's captured output to this process's
    /// stdout and stderr.
    #[must_use]
    pub fn new(timeout: Duration, echo: bool) -> Self {
        Self { timeout, echo }
    }

    async fn run(&self, cmd: &str, cwd: Option<&Path>, env: &EnvOverlay) -> Result<Output> {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        for (key, value) in env.iter() {
            match value {
                Some(value) => command.env(key, value),
                None => command.env_remove(key),
            };
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn `{cmd}`"))?;
        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        let output = tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                anyhow::Ok(Output {
                    status: status.with_context(|| format!("waiting for `{cmd}`"))?,
                    stdout,
                    stderr,
                })
            } => result?,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("`{cmd}` timed out after {}s", self.timeout.as_secs())
            }
        };

        if self.echo {
            print!("{}", String::from_utf8_lossy(&output.stdout));
            eprint!("{}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(output)
    }

    /// Runs an installer command; a non-zero exit is an error.
    async fn install(&self, cmd: &str) -> Result<()> {
        let output = self.run(cmd, None, &EnvOverlay::default()).await?;
        if !output.status.success() {
            anyhow::bail!("`{cmd}` exited with {}", output.status);
        }
        Ok(())
    }
}

impl ExecutionContext for LocalContext {
    async fn shell(&self, cmd: &str, opts: &ShellOpts<'_>) -> Result<Output> {
        self.run(cmd, Some(opts.cwd), opts.env).await
    }

    async fn ssh_keygen(&self, comment: &str, path: &Path) -> Result<()> {
        let cmd = format!(
            "ssh-keygen -t ed25519 -N '' -q -C {} -f {}",
            escape(comment),
            escape(&path.to_string_lossy())
        );
        self.install(&cmd).await
    }

    async fn apt_get(&self, packages: &[String]) -> Result<()> {
        self.install(&format!(
            "sudo apt-get -qq update && sudo apt-get -qq install -y {}",
            words(packages)
        ))
        .await
    }

    async fn gems_require(&self, gems: &[String]) -> Result<()> {
        self.install(&format!("gem install --no-document {}", words(gems)))
            .await
    }

    async fn npm_install(&self, package: &Package) -> Result<()> {
        self.install(&format!("npm install -g {}", package_words(package)))
            .await
    }

    async fn pip_install(&self, package: &Package) -> Result<()> {
        self.install(&format!("pip install {}", package_words(package)))
            .await
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

fn words(items: &[String]) -> String {
    items
        .iter()
        .map(String::as_str)
        .map(escape)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Package name followed by its extra arguments, which are passed through
/// unescaped.
fn package_words(package: &Package) -> String {
    let mut parts = vec![escape(&package.name)];
    parts.extend(package.args.iter().cloned());
    parts.join(" ")
}
