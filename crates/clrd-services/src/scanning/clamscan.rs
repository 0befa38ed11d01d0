use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clrd_core::ScanOutcome;
use tokio::process::Command;

use super::{signature_from_found_line, ScanBackend};

/// Map a finished scanner process to an outcome.
///
/// `FOUND` anywhere in the output, or exit code 1, means infected; exit code 0
/// means clean; anything else (including death by signal) is an error.
pub fn interpret_clamscan(exit_code: Option<i32>, output: &str) -> ScanOutcome {
    if let Some(signature) = output.lines().find_map(signature_from_found_line) {
        return ScanOutcome::Infected(signature);
    }

    match exit_code {
        Some(0) => ScanOutcome::Clean,
        Some(1) => ScanOutcome::Infected("unknown".to_string()),
        Some(code) => ScanOutcome::Error(format!(
            "scanner exited with code {}: {}",
            code,
            output.trim()
        )),
        None => ScanOutcome::Error("scanner terminated by signal".to_string()),
    }
}

/// Scanner that runs a local `clamscan`-compatible program against the staged path
#[derive(Clone, Debug)]
pub struct ClamscanScanner {
    program: String,
    /// Arguments placed before the scanned path
    args: Vec<String>,
    timeout: Duration,
}

impl ClamscanScanner {
    pub fn new(program: String, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }

    async fn run(&self, path: &Path) -> ScanOutcome {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ScanOutcome::Error(format!("failed to run {}: {}", self.program, e))
            }
            Err(_) => {
                return ScanOutcome::Error(format!(
                    "{} timed out after {} seconds",
                    self.program,
                    self.timeout.as_secs_f64()
                ))
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        interpret_clamscan(output.status.code(), &combined)
    }
}

#[async_trait]
impl ScanBackend for ClamscanScanner {
    async fn scan_path(&self, path: &Path) -> ScanOutcome {
        let start = Instant::now();
        let outcome = self.run(path).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            ScanOutcome::Clean => tracing::info!(
                scanner = "clamscan",
                path = %path.display(),
                duration_ms,
                "File scan completed: clean"
            ),
            ScanOutcome::Infected(threat) => tracing::warn!(
                scanner = "clamscan",
                path = %path.display(),
                duration_ms,
                virus = %threat,
                "File scan detected virus"
            ),
            ScanOutcome::Error(cause) => tracing::error!(
                scanner = "clamscan",
                path = %path.display(),
                duration_ms,
                error = %cause,
                "clamscan failed"
            ),
        }

        outcome
    }

    async fn scan_bytes(&self, data: &[u8]) -> ScanOutcome {
        let data = data.to_vec();
        let written = tokio::task::spawn_blocking(move || -> std::io::Result<tempfile::TempPath> {
            let mut file = tempfile::Builder::new().prefix("clrd-scan-").tempfile()?;
            file.write_all(&data)?;
            file.as_file().sync_all()?;
            Ok(file.into_temp_path())
        })
        .await;

        match written {
            Ok(Ok(temp)) => self.scan_path(&temp).await,
            Ok(Err(e)) => ScanOutcome::Error(format!("failed to buffer content for scan: {}", e)),
            Err(e) => ScanOutcome::Error(format!("scan buffer task join error: {}", e)),
        }
    }

    fn name(&self) -> &'static str {
        "clamscan"
    }

    async fn is_available(&self) -> bool {
        let mut command = Command::new(&self.program);
        command
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!(program = %self.program, error = %e, "clamscan probe failed");
                false
            }
            Err(_) => false,
        }
    }
}
