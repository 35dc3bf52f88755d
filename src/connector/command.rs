//! Command Gateways
//!
//! Concrete [`CommandGateway`]s: one runs shell command lines on the local
//! host (with `sudo` for privileged tools), the other runs them on a remote
//! host over SSH. Each command is bounded by a fixed timeout and never
//! retried.

use crate::domain::ports::{CommandGateway, CommandOutput};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run a prepared command, bounded by `timeout`
async fn run_bounded(mut command: Command, command_line: &str, timeout: Duration) -> Result<CommandOutput> {
    command.kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(Error::CommandFailed {
                command: command_line.to_string(),
                reason: e.to_string(),
            })
        }
        Err(_) => {
            warn!("Command timed out after {:?}: {}", timeout, command_line);
            return Err(Error::CommandTimeout {
                command: command_line.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    };
    if !result.success() {
        debug!("Command exited with {:?}: {}", result.exit_code, command_line);
    }
    Ok(result)
}

/// Whether `sudo -l` output grants `tool`
fn sudo_listing_grants(listing: &str, tool: &str) -> bool {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('(') || line.starts_with('/'))
        .any(|line| line.ends_with("ALL") || line.contains(tool))
}

// =============================================================================
// Local Gateway
// =============================================================================

/// Runs command lines through `sh -c` on this host
#[derive(Debug, Clone)]
pub struct LocalCommandGateway {
    timeout: Duration,
}

impl LocalCommandGateway {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn is_root(&self) -> Result<bool> {
        let output = self.exec("id -u").await?;
        Ok(output.stdout.trim() == "0")
    }
}

#[async_trait]
impl CommandGateway for LocalCommandGateway {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run_bounded(cmd, command, self.timeout).await
    }

    async fn exec_privileged(&self, command: &str) -> Result<CommandOutput> {
        if self.is_root().await? {
            self.exec(command).await
        } else {
            self.exec(&format!("sudo -n {}", command)).await
        }
    }

    async fn check_root_permission(&self, tool: &str) -> Result<bool> {
        if self.is_root().await? {
            return Ok(true);
        }
        let listing = self.exec("sudo -n -l").await?;
        Ok(listing.success() && sudo_listing_grants(&listing.stdout, tool))
    }

    fn target(&self) -> &str {
        "localhost"
    }
}

// =============================================================================
// SSH Gateway
// =============================================================================

/// Runs command lines on a remote host with password SSH via `sshpass`
#[derive(Clone)]
pub struct SshCommandGateway {
    address: String,
    user: String,
    password: String,
    timeout: Duration,
}

impl SshCommandGateway {
    pub fn new(
        address: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            user: user.into(),
            password: password.into(),
            timeout,
        }
    }

    fn ssh_command(&self, command: &str) -> Command {
        let mut cmd = Command::new("sshpass");
        cmd.arg("-e")
            .arg("ssh")
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.timeout.as_secs().max(1)))
            .arg(format!("{}@{}", self.user, self.address))
            .arg(command)
            .env("SSHPASS", &self.password);
        cmd
    }
}

impl std::fmt::Debug for SshCommandGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshCommandGateway")
            .field("address", &self.address)
            .field("user", &self.user)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CommandGateway for SshCommandGateway {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let command_line = format!("{}@{}: {}", self.user, self.address, command);
        run_bounded(self.ssh_command(command), &command_line, self.timeout).await
    }

    /// The remote shell already runs as the login user
    async fn exec_privileged(&self, command: &str) -> Result<CommandOutput> {
        self.exec(command).await
    }

    async fn check_root_permission(&self, _tool: &str) -> Result<bool> {
        let output = self.exec("id -u").await?;
        Ok(output.stdout.trim() == "0")
    }

    fn target(&self) -> &str {
        &self.address
    }
}

// =============================================================================
// Scripted Gateway (tests)
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Debug, Clone)]
    enum Scripted {
        Output(CommandOutput),
        Timeout,
        Broken,
    }

    /// Gateway answering exact command lines from a script.
    ///
    /// Unscripted commands exit 127 with empty output.
    #[derive(Debug)]
    pub struct ScriptedGateway {
        script: HashMap<String, Scripted>,
        root: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        pub fn new() -> Self {
            Self {
                script: HashMap::new(),
                root: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn respond(mut self, command: &str, stdout: &str) -> Self {
            self.script
                .insert(command.to_string(), Scripted::Output(CommandOutput::ok(stdout)));
            self
        }

        pub fn fail(mut self, command: &str, exit_code: i32) -> Self {
            self.script.insert(
                command.to_string(),
                Scripted::Output(CommandOutput {
                    stdout: String::new(),
                    stderr: "failed".to_string(),
                    exit_code: Some(exit_code),
                }),
            );
            self
        }

        pub fn time_out(mut self, command: &str) -> Self {
            self.script.insert(command.to_string(), Scripted::Timeout);
            self
        }

        /// The transport drops while running `command`
        pub fn break_on(mut self, command: &str) -> Self {
            self.script.insert(command.to_string(), Scripted::Broken);
            self
        }

        pub fn without_root(mut self) -> Self {
            self.root = false;
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl CommandGateway for ScriptedGateway {
        async fn exec(&self, command: &str) -> Result<CommandOutput> {
            self.calls.lock().push(command.to_string());
            match self.script.get(command) {
                Some(Scripted::Output(output)) => Ok(output.clone()),
                Some(Scripted::Timeout) => Err(Error::CommandTimeout {
                    command: command.to_string(),
                    timeout_secs: 5,
                }),
                Some(Scripted::Broken) => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))),
                None => Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: "command not found".to_string(),
                    exit_code: Some(127),
                }),
            }
        }

        async fn exec_privileged(&self, command: &str) -> Result<CommandOutput> {
            self.exec(command).await
        }

        async fn check_root_permission(&self, _tool: &str) -> Result<bool> {
            Ok(self.root)
        }

        fn target(&self) -> &str {
            "scripted"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedGateway;
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_sudo_listing_grants() {
        let listing = "Matching Defaults entries for agent on node-a:\n    env_reset\n\n\
                       User agent may run the following commands on node-a:\n    \
                       (root) NOPASSWD: /usr/sbin/smartctl, /usr/sbin/dmidecode\n";
        assert!(sudo_listing_grants(listing, "smartctl"));
        assert!(!sudo_listing_grants(listing, "nvme"));

        let admin = "User admin may run the following commands on node-a:\n    (ALL : ALL) ALL\n";
        assert!(sudo_listing_grants(admin, "smartctl"));
        assert!(!sudo_listing_grants("", "smartctl"));
    }

    #[tokio::test]
    async fn test_local_exec() {
        let gateway = LocalCommandGateway::new(Duration::from_secs(5));
        let output = gateway.exec("echo inventory").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "inventory");

        let output = gateway.exec("exit 3").await.unwrap();
        assert_eq!(output.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_local_exec_timeout() {
        let gateway = LocalCommandGateway::new(Duration::from_millis(100));
        assert_matches!(
            gateway.exec("sleep 5").await,
            Err(Error::CommandTimeout { command, .. }) if command == "sleep 5"
        );
    }

    #[tokio::test]
    async fn test_scripted_gateway() {
        let gateway = ScriptedGateway::new()
            .respond("hostname", "esx-01\n")
            .time_out("slow");

        assert_eq!(gateway.exec("hostname").await.unwrap().stdout, "esx-01\n");
        assert_matches!(gateway.exec("slow").await, Err(Error::CommandTimeout { .. }));
        assert_eq!(gateway.exec("missing").await.unwrap().exit_code, Some(127));
        assert_eq!(gateway.calls(), vec!["hostname", "slow", "missing"]);
    }
}
