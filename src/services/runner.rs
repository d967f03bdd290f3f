use crate::services::invocation::Invocation;
use regex::Regex;
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Errors from running the processor
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Processor not found: {0}")]
    NotFound(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Processor exited with status {0}")]
    ExitStatus(i32),

    #[error("Processor was terminated by a signal")]
    Terminated,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,

    #[error("Process error: {0}")]
    Io(#[from] io::Error),
}

/// Result of a successful processor run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub duration: Duration,
    /// Forwarded lines that looked like errors
    pub error_lines: usize,
    /// Forwarded lines that looked like warnings
    pub warning_lines: usize,
}

/// Runs a prepared invocation to completion.
///
/// Implementations report a non-zero exit or a missing binary as
/// [`ProcessError`]. Dropping the returned future must stop the child.
#[cfg_attr(test, mockall::automock)]
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Error,
    Warning,
    Info,
}

/// Production runner backed by `tokio::process`.
///
/// stdout and stderr are forwarded line by line to the log. Lines matching
/// the error or warning patterns are logged at `warn`, everything else at
/// `info`. Output is never parsed for results: only the exit status counts.
pub struct TokioProcessRunner {
    /// Kill the child after this long, if set
    timeout: Option<Duration>,

    /// Regex for lines like "Error: ...", "FATAL ...", "exception"
    error_pattern: Regex,

    /// Regex for lines like "Warning: ..."
    warning_pattern: Regex,
}

impl TokioProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            error_pattern: Regex::new(r"(?i)\b(error|fatal|exception|failed)\b").expect("Invalid error regex"),
            warning_pattern: Regex::new(r"(?i)\bwarn(ing)?\b").expect("Invalid warning regex"),
        }
    }

    fn classify(&self, line: &str) -> LineKind {
        if self.error_pattern.is_match(line) {
            LineKind::Error
        } else if self.warning_pattern.is_match(line) {
            LineKind::Warning
        } else {
            LineKind::Info
        }
    }

    /// Forward one output stream to the log, returning (errors, warnings).
    ///
    /// Lines are read as raw bytes and decoded lossily. The stream is always
    /// drained to EOF so the child never writes into a closed pipe.
    async fn forward<R: AsyncRead + Unpin>(&self, reader: Option<R>, stream: &str) -> (usize, usize) {
        let Some(reader) = reader else {
            return (0, 0);
        };

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let (mut errors, mut warnings) = (0, 0);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim_end_matches(['\n', '\r']);
                    match self.classify(line) {
                        LineKind::Error => {
                            errors += 1;
                            tracing::warn!("[processor {}] {}", stream, line);
                        }
                        LineKind::Warning => {
                            warnings += 1;
                            tracing::warn!("[processor {}] {}", stream, line);
                        }
                        LineKind::Info => tracing::info!("[processor {}] {}", stream, line),
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read processor {}: {}, discarding the rest", stream, e);
                    if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                        tracing::warn!("Failed to drain processor {}: {}", stream, e);
                    }
                    break;
                }
            }
        }

        (errors, warnings)
    }
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        tracing::info!("Executing: {}", invocation);

        let start = Instant::now();

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => ProcessError::NotFound(invocation.program.clone()),
                _ => ProcessError::Spawn {
                    program: invocation.program.clone(),
                    source,
                },
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let completion = async {
            let ((out_errors, out_warnings), (err_errors, err_warnings)) =
                tokio::join!(self.forward(stdout, "stdout"), self.forward(stderr, "stderr"));
            let status = child.wait().await;
            (status, out_errors + err_errors, out_warnings + err_warnings)
        };

        let (status, error_lines, warning_lines) = match self.timeout {
            Some(limit) => match timeout(limit, completion).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Processor timed out after {:?}", limit);
                    let _ = child.start_kill();
                    return Err(ProcessError::Timeout(limit));
                }
            },
            None => completion.await,
        };

        let status = status?;
        let duration = start.elapsed();

        tracing::info!(
            "Processor completed in {:.2}s with status {}",
            duration.as_secs_f32(),
            status
        );

        match status.code() {
            Some(0) => Ok(ProcessOutput {
                exit_code: 0,
                duration,
                error_lines,
                warning_lines,
            }),
            Some(code) => Err(ProcessError::ExitStatus(code)),
            None => Err(ProcessError::Terminated),
        }
    }
}
