//! Runs one staged candidate through the external toolchain.
//!
//! The build step is judged by whether the simulation artifact exists
//! afterwards, never by the toolchain's exit status. The simulation step is
//! bounded by the run timeout; on expiry the whole process group is killed
//! so a runaway simulator cannot outlive its trial. The clean step runs on
//! every path out of [`TrialExecutor::execute`].

use rtl_bench_core::{RunStatus, TrialOutcome};
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

use crate::toolchain::{SuccessMarker, ToolchainConfig};

/// Upper bound on the clean step so a wedged `clean` cannot stall the run.
const CLEAN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepStatus {
    Finished,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct TrialExecutor {
    toolchain: Arc<ToolchainConfig>,
    marker: Arc<SuccessMarker>,
}

impl TrialExecutor {
    pub fn new(toolchain: ToolchainConfig, marker: SuccessMarker) -> Self {
        Self {
            toolchain: Arc::new(toolchain),
            marker: Arc::new(marker),
        }
    }

    pub fn toolchain(&self) -> &ToolchainConfig {
        &self.toolchain
    }

    /// Build, simulate and classify the candidate staged in `workdir`.
    ///
    /// Never fails: toolchain problems are folded into the outcome.
    pub async fn execute(&self, workdir: &Path) -> TrialOutcome {
        if !workdir.is_dir() {
            tracing::warn!(workdir = %workdir.display(), "trial directory missing, counting as build failure");
            return TrialOutcome::BuildFailed;
        }

        let outcome = self.build_and_run(workdir).await;
        self.clean(workdir).await;

        tracing::debug!(workdir = %workdir.display(), outcome = %outcome, "trial classified");
        outcome
    }

    async fn build_and_run(&self, workdir: &Path) -> TrialOutcome {
        let artifact = self.toolchain.artifact_path(workdir);
        // A stale artifact from an earlier, uncleaned trial would fake a build.
        if let Err(e) = tokio::fs::remove_file(&artifact).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(artifact = %artifact.display(), error = %e, "could not remove stale artifact");
            }
        }

        match self.build(workdir).await {
            Ok(StepStatus::Finished) => {}
            Ok(StepStatus::TimedOut) => return TrialOutcome::BuildTimedOut,
            Err(e) => {
                tracing::warn!(workdir = %workdir.display(), error = %e, "build step could not be started");
                return TrialOutcome::BuildFailed;
            }
        }

        if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            return TrialOutcome::BuildFailed;
        }

        match self.run(workdir).await {
            Ok(RunStatus::Completed) => {
                let output_path = self.toolchain.output_path(workdir);
                match tokio::fs::read(&output_path).await {
                    Ok(bytes) => {
                        if self.marker.matches(&String::from_utf8_lossy(&bytes)) {
                            TrialOutcome::SimPassed
                        } else {
                            TrialOutcome::SimFailed
                        }
                    }
                    Err(e) => {
                        tracing::warn!(output = %output_path.display(), error = %e, "simulation output unreadable");
                        TrialOutcome::SimFailed
                    }
                }
            }
            Ok(RunStatus::TimedOut) => TrialOutcome::RunTimedOut,
            Err(e) => {
                tracing::warn!(workdir = %workdir.display(), error = %e, "simulation could not be started");
                TrialOutcome::SimFailed
            }
        }
    }

    async fn build(&self, workdir: &Path) -> io::Result<StepStatus> {
        let child = shell(&self.toolchain.build_command, workdir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        match self.toolchain.build_timeout() {
            Some(limit) => wait_bounded(child, limit).await,
            None => {
                let mut child = child;
                child.wait().await?;
                Ok(StepStatus::Finished)
            }
        }
    }

    async fn run(&self, workdir: &Path) -> io::Result<RunStatus> {
        let output = tokio::fs::File::create(self.toolchain.output_path(workdir))
            .await?
            .into_std()
            .await;
        let child = shell(&self.toolchain.run_command, workdir)
            .stdout(Stdio::from(output))
            .stderr(Stdio::null())
            .spawn()?;

        match wait_bounded(child, self.toolchain.run_timeout()).await? {
            StepStatus::Finished => Ok(RunStatus::Completed),
            StepStatus::TimedOut => {
                tracing::info!(
                    workdir = %workdir.display(),
                    timeout_secs = self.toolchain.run_timeout_secs,
                    "simulation timed out, process group killed"
                );
                Ok(RunStatus::TimedOut)
            }
        }
    }

    async fn clean(&self, workdir: &Path) {
        let spawned = shell(&self.toolchain.clean_command, workdir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let result = match spawned {
            Ok(child) => wait_bounded(child, CLEAN_TIMEOUT).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(StepStatus::Finished) => {}
            Ok(StepStatus::TimedOut) => {
                tracing::warn!(workdir = %workdir.display(), "clean step timed out");
            }
            Err(e) => {
                tracing::warn!(workdir = %workdir.display(), error = %e, "clean step failed");
            }
        }
    }
}

/// `sh -c <command>` in `workdir`, in its own process group.
fn shell(command: &str, workdir: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

async fn wait_bounded(mut child: Child, limit: Duration) -> io::Result<StepStatus> {
    match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => {
            status?;
            Ok(StepStatus::Finished)
        }
        Err(_) => {
            terminate(&mut child);
            if let Err(e) = child.wait().await {
                tracing::warn!(error = %e, "failed to reap killed process");
            }
            Ok(StepStatus::TimedOut)
        }
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The child leads its own group, so a negative pid reaches every descendant.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }
    if let Err(e) = child.start_kill() {
        if e.kind() != io::ErrorKind::InvalidInput {
            tracing::warn!(error = %e, "failed to kill child process");
        }
    }
}
