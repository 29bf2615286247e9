//! Runs the external classification engine once per request.
//!
//! Lifecycle per request: `NotStarted → Running → {Succeeded, Failed, TimedOut}`.
//! A run succeeds only if the process exits with status 0 **and** writes
//! nothing to stderr. Any stderr output is a failure, even with exit 0.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisError;
use crate::config::EngineConfig;

const DEFAULT_FAILURE_MESSAGE: &str = "Prediction failed";

/// Everything the engine wrote to stdout during a successful run, byte for
/// byte. Text decoding is left to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput(Vec<u8>);

impl RawOutput {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

/// Book-keeping for a single engine invocation.
struct AnalysisRequest<'a> {
    staged_path: &'a Path,
    started_at: Instant,
    state: RunState,
}

impl<'a> AnalysisRequest<'a> {
    fn new(staged_path: &'a Path) -> Self {
        Self {
            staged_path,
            started_at: Instant::now(),
            state: RunState::NotStarted,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(
            "Engine run for {}: {:?} -> {:?} after {}ms",
            self.staged_path.display(),
            self.state,
            next,
            self.started_at.elapsed().as_millis()
        );
        self.state = next;
    }
}

/// Launches the configured engine as `program [args...] <staged path>`.
/// Processes are never reused; each call spawns, drains and reaps its own child.
#[derive(Debug, Clone)]
pub struct AnalysisRunner {
    config: EngineConfig,
}

impl AnalysisRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, staged_path: &Path) -> Result<RawOutput, AnalysisError> {
        let mut request = AnalysisRequest::new(staged_path);

        // kill_on_drop: a cancelled request takes its child down with it.
        let spawned = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(staged_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                request.transition(RunState::Failed);
                return Err(AnalysisError::Spawn {
                    program: self.config.program.clone(),
                    source,
                });
            }
        };
        request.transition(RunState::Running);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes must be drained alongside wait() or a chatty engine can
        // block on a full pipe buffer and never exit.
        let finished = timeout(self.config.timeout, async {
            let (out, err, status) = tokio::join!(drain(stdout), drain(stderr), child.wait());
            Ok::<_, std::io::Error>((out?, err?, status?))
        })
        .await;

        let outcome = match finished {
            Err(_) => {
                request.transition(RunState::TimedOut);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed-out engine process: {e}");
                }
                return Err(AnalysisError::Timeout(self.config.timeout));
            }
            Ok(Err(e)) => Err(AnalysisError::ProcessFailure {
                exit_code: None,
                diagnostic: format!("Failed to read engine output: {e}"),
            }),
            Ok(Ok((out, err, status))) => evaluate_completion(status.code(), &out, &err),
        };

        match &outcome {
            Ok(raw) => {
                request.transition(RunState::Succeeded);
                info!(
                    "Engine finished in {}ms ({} bytes of output)",
                    request.started_at.elapsed().as_millis(),
                    raw.as_bytes().len()
                );
            }
            Err(e) => {
                request.transition(RunState::Failed);
                warn!("Engine run failed: {e}");
            }
        }

        outcome
    }
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Applies the completion rule to a finished process.
/// `exit_code` is `None` when the process was terminated by a signal.
pub fn evaluate_completion(
    exit_code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<RawOutput, AnalysisError> {
    if exit_code == Some(0) && stderr.is_empty() {
        return Ok(RawOutput(stdout.to_vec()));
    }

    let diagnostic = String::from_utf8_lossy(stderr).trim().to_string();
    Err(AnalysisError::ProcessFailure {
        exit_code,
        diagnostic: if diagnostic.is_empty() {
            DEFAULT_FAILURE_MESSAGE.to_string()
        } else {
            diagnostic
        },
    })
}

/// Polls until `pid` has exited (gone or zombie). False if it is still
/// running after roughly five seconds.
#[cfg(all(test, target_os = "linux"))]
pub(crate) async fn wait_for_exit(pid: u32) -> bool {
    for _ in 0..50 {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => return true,
            Ok(stat) => {
                let state = stat.rsplit(')').next().map(str::trim_start);
                if state.is_some_and(|s| s.starts_with('Z')) {
                    return true;
                }
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    false
}
