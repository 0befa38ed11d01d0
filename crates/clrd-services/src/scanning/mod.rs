//! Virus scanning backends
//!
//! Two interchangeable strategies answer "is this content malicious": a clamd
//! daemon reached over TCP, and a local `clamscan`-compatible process. Both fail
//! closed: every connectivity, protocol, process or timeout problem is reported
//! as [`ScanOutcome::Error`], never as clean.

mod clamd;
mod clamscan;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clrd_core::{Config, ScanBackendKind, ScanOutcome};

pub use clamd::{parse_clamd_response, ClamdScanner};
pub use clamscan::{interpret_clamscan, ClamscanScanner};

/// Contract shared by every scanner implementation.
///
/// Implementations read the whole content and never modify or delete it.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Scan the file at `path`
    async fn scan_path(&self, path: &Path) -> ScanOutcome;

    /// Scan an in-memory buffer
    async fn scan_bytes(&self, data: &[u8]) -> ScanOutcome;

    /// Short name used in logs and the health report
    fn name(&self) -> &'static str;

    /// Probe whether the scanner can currently be reached
    async fn is_available(&self) -> bool;
}

/// Build the scanner selected by `SCAN_BACKEND`.
pub fn create_scanner(config: &Config) -> Arc<dyn ScanBackend> {
    let timeout = Duration::from_secs(config.scan_timeout_secs());

    match config.scan_backend() {
        ScanBackendKind::Clamd => {
            tracing::info!(
                host = %config.clamav_host(),
                port = config.clamav_port(),
                "Using clamd scan backend"
            );
            Arc::new(ClamdScanner::new(
                config.clamav_host().to_string(),
                config.clamav_port(),
                timeout,
            ))
        }
        ScanBackendKind::Clamscan => {
            tracing::info!(
                program = %config.clamscan_path(),
                "Using clamscan scan backend"
            );
            Arc::new(ClamscanScanner::new(
                config.clamscan_path().to_string(),
                config.clamscan_args().to_vec(),
                timeout,
            ))
        }
    }
}

/// Pull the signature name out of a `<subject>: <signature> FOUND` line.
pub(crate) fn signature_from_found_line(line: &str) -> Option<String> {
    let line = line.trim();
    let rest = line.strip_suffix("FOUND")?.trim_end();
    let signature = match rest.rsplit_once(": ") {
        Some((_, signature)) => signature.trim(),
        None => rest.trim_start_matches(':').trim(),
    };

    if signature.is_empty() {
        Some("unknown".to_string())
    } else {
        Some(signature.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_signature() {
        assert_eq!(
            signature_from_found_line("stream: Eicar-Test-Signature FOUND"),
            Some("Eicar-Test-Signature".to_string())
        );
        assert_eq!(
            signature_from_found_line("/tmp/staging/upload-x.png: Win.Test.EICAR_HDB-1 FOUND"),
            Some("Win.Test.EICAR_HDB-1".to_string())
        );
        assert_eq!(signature_from_found_line("FOUND"), Some("unknown".to_string()));
        assert_eq!(signature_from_found_line("stream: OK"), None);
    }

    #[tokio::test]
    async fn mock_backend_is_usable_as_trait_object() {
        let mut mock = MockScanBackend::new();
        mock.expect_scan_bytes()
            .times(1)
            .returning(|_| ScanOutcome::Infected("EICAR".to_string()));
        mock.expect_name().return_const("mock");

        let scanner: Arc<dyn ScanBackend> = Arc::new(mock);
        assert_eq!(
            scanner.scan_bytes(b"X5O!P%@AP").await,
            ScanOutcome::Infected("EICAR".to_string())
        );
        assert_eq!(scanner.name(), "mock");
    }
}
