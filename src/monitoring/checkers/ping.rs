use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, warn};

use super::CheckError;
use crate::monitoring::target::Target;

/// Sends a single echo request through the system `ping` binary.
///
/// The process gets the target timeout plus one second before it is killed.
pub async fn check_ping(target: &Target) -> bool {
    probe_reachability(target, ping_command(&target.address, target.timeout)).await
}

/// Runs `command` as the reachability probe for `target`, logging any failure.
pub async fn probe_reachability(target: &Target, command: Command) -> bool {
    let budget = target.timeout + Duration::from_secs(1);
    match run_probe(command, budget).await {
        Ok(true) => true,
        Ok(false) => {
            warn!(monitor = %target.name, host = %target.address, "Ping reported host unreachable.");
            false
        }
        Err(CheckError::Timeout(after)) => {
            warn!(monitor = %target.name, ?after, "Ping timed out.");
            false
        }
        Err(e) => {
            error!(monitor = %target.name, error = %e, "Ping check failed.");
            false
        }
    }
}

/// Runs a probe process and reports whether it exited successfully within `budget`.
pub async fn run_probe(mut command: Command, budget: Duration) -> Result<bool, CheckError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    match tokio::time::timeout(budget, child.wait()).await {
        Ok(status) => Ok(status?.success()),
        Err(_) => Err(CheckError::Timeout(budget)),
    }
}

#[cfg(windows)]
fn ping_command(host: &str, timeout: Duration) -> Command {
    let mut command = Command::new("ping");
    command
        .args(["-n", "1", "-w"])
        .arg(timeout.as_millis().max(1).to_string())
        .arg(host);
    command
}

#[cfg(target_os = "macos")]
fn ping_command(host: &str, timeout: Duration) -> Command {
    let mut command = Command::new("ping");
    command
        .args(["-c", "1", "-W"])
        .arg(timeout.as_millis().max(1).to_string())
        .arg(host);
    command
}

#[cfg(not(any(windows, target_os = "macos")))]
fn ping_command(host: &str, timeout: Duration) -> Command {
    let wait_secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
    let mut command = Command::new("ping");
    command
        .args(["-c", "1", "-W"])
        .arg(wait_secs.to_string())
        .arg(host);
    command
}
