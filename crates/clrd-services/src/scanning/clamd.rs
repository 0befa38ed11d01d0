use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clamav_client::Tcp;
use clrd_core::ScanOutcome;

use super::{signature_from_found_line, ScanBackend};

/// Interpret a clamd INSTREAM reply.
///
/// Infected when any line carries the `FOUND` marker, clean when every line is
/// `OK`, error for anything else (including an empty reply).
pub fn parse_clamd_response(response: &[u8]) -> ScanOutcome {
    let text = String::from_utf8_lossy(response);
    let lines: Vec<&str> = text
        .split(['\0', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return ScanOutcome::Error("Empty response from clamd".to_string());
    }

    if let Some(signature) = lines.iter().find_map(|line| signature_from_found_line(line)) {
        return ScanOutcome::Infected(signature);
    }

    if lines.iter().all(|line| line.ends_with("OK")) {
        ScanOutcome::Clean
    } else {
        ScanOutcome::Error(format!("Unexpected clamd response: {}", lines.join("; ")))
    }
}

/// Scanner backed by a clamd daemon over TCP
#[derive(Clone, Debug)]
pub struct ClamdScanner {
    host: String,
    port: u16,
    /// Upper bound for each scan or ping
    timeout: Duration,
}

impl ClamdScanner {
    pub fn new(host: String, port: u16, timeout: Duration) -> Self {
        Self {
            host,
            port,
            timeout,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Run a blocking clamav-client call off the runtime, bounded by the timeout.
    async fn run<F>(&self, op: F) -> Result<Vec<u8>, String>
    where
        F: FnOnce(&str) -> io::Result<Vec<u8>> + Send + 'static,
    {
        let address = self.address();
        let result = tokio::time::timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || op(address.as_str())),
        )
        .await;

        match result {
            Ok(Ok(Ok(bytes))) => Ok(bytes),
            Ok(Ok(Err(e))) => Err(format!("clamd error: {}", e)),
            Ok(Err(e)) => Err(format!("clamd task join error: {}", e)),
            Err(_) => Err(format!(
                "clamd scan timeout (exceeded {} seconds)",
                self.timeout.as_secs_f64()
            )),
        }
    }

    async fn scan_with<F>(&self, op: F) -> ScanOutcome
    where
        F: FnOnce(&str) -> io::Result<Vec<u8>> + Send + 'static,
    {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = self.port, "Starting clamd scan");

        let outcome = match self.run(op).await {
            Ok(response) => parse_clamd_response(&response),
            Err(message) => ScanOutcome::Error(message),
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &outcome {
            ScanOutcome::Clean => {
                tracing::info!(scanner = "clamd", duration_ms, "File scan completed: clean")
            }
            ScanOutcome::Infected(threat) => tracing::warn!(
                scanner = "clamd",
                duration_ms,
                virus = %threat,
                "File scan detected virus"
            ),
            ScanOutcome::Error(cause) => tracing::error!(
                scanner = "clamd",
                duration_ms,
                error = %cause,
                "clamd scan failed"
            ),
        }

        outcome
    }
}

#[async_trait]
impl ScanBackend for ClamdScanner {
    async fn scan_path(&self, path: &Path) -> ScanOutcome {
        let path = path.to_path_buf();
        self.scan_with(move |address| {
            clamav_client::scan_file(&path, Tcp { host_address: address }, None)
        })
        .await
    }

    async fn scan_bytes(&self, data: &[u8]) -> ScanOutcome {
        let data = data.to_vec();
        self.scan_with(move |address| {
            clamav_client::scan_buffer(data.as_slice(), Tcp { host_address: address }, None)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "clamd"
    }

    async fn is_available(&self) -> bool {
        match self
            .run(|address| clamav_client::ping(Tcp { host_address: address }))
            .await
        {
            Ok(reply) => reply == clamav_client::PONG,
            Err(message) => {
                tracing::debug!(error = %message, "clamd ping failed");
                false
            }
        }
    }
}
