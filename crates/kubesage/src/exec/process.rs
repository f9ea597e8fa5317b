//! Process spawning with a hard deadline and process-group termination.
//!
//! Every command runs as `sh -c <line>` in its own process group, so a
//! pipeline such as `kubectl logs -f web | grep error` can be killed as a
//! unit: on deadline expiry the whole group receives `SIGKILL`, not just the
//! `sh` leader. Output read before the kill is kept.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Raw result of one process run.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the deadline fired before the process exited.
    pub status: Option<ExitStatus>,
}

impl ProcessOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }
}

/// Run `command_line` through `sh -c`, killing its process group after
/// `timeout`.
///
/// Returns `Err` only when the process could not be spawned or its pipes
/// failed; a timeout is reported through [`ProcessOutput::timed_out`].
pub(crate) async fn run_with_deadline(
    command_line: &str,
    timeout: Duration,
) -> io::Result<ProcessOutput> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    debug!("spawned pid {:?}: {command_line}", child.id());

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let run = async {
        let (out, err) = tokio::join!(
            read_pipe(&mut stdout_pipe, &mut stdout),
            read_pipe(&mut stderr_pipe, &mut stderr),
        );
        out?;
        err?;
        child.wait().await
    };

    let outcome = tokio::time::timeout(timeout, run).await;
    match outcome {
        Ok(status) => Ok(ProcessOutput {
            stdout,
            stderr,
            status: Some(status?),
        }),
        Err(_) => {
            terminate_tree(&mut child);
            if let Err(e) = child.wait().await {
                warn!("failed to reap timed-out process: {e}");
            }
            Ok(ProcessOutput {
                stdout,
                stderr,
                status: None,
            })
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: &mut Option<R>, buf: &mut Vec<u8>) -> io::Result<()> {
    if let Some(reader) = pipe.as_mut() {
        reader.read_to_end(buf).await?;
    }
    Ok(())
}

/// Kill the child and every process in its group.
fn terminate_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The child was spawned with process_group(0), so its pgid is its pid.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!("killpg({pid}) failed: {err}");
            }
        }
    }
    if let Err(e) = child.start_kill() {
        debug!("start_kill after group kill: {e}");
    }
}
