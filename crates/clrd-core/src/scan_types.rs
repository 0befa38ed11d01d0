use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Scan backend types
///
/// Selects which virus-scan strategy the service is wired with at startup.
/// The ingestion pipeline never looks at this value; it only sees the
/// `ScanBackend` trait object built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanBackendKind {
    /// Networked ClamAV daemon (INSTREAM over TCP)
    Clamd,
    /// Local scanner process invoked against the staged path
    Clamscan,
}

impl FromStr for ScanBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamd" | "daemon" => Ok(ScanBackendKind::Clamd),
            "clamscan" | "local" | "process" => Ok(ScanBackendKind::Clamscan),
            _ => Err(anyhow::anyhow!("Invalid scan backend: {}", s)),
        }
    }
}

impl Display for ScanBackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScanBackendKind::Clamd => write!(f, "clamd"),
            ScanBackendKind::Clamscan => write!(f, "clamscan"),
        }
    }
}

/// Verdict of one scan invocation. Produced once per file and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Clean,
    /// Signature/description reported by the scanner
    Infected(String),
    /// Connectivity, protocol, process or timeout failure
    Error(String),
}

impl Display for ScanOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScanOutcome::Clean => write!(f, "clean"),
            ScanOutcome::Infected(threat) => write!(f, "infected: {}", threat),
            ScanOutcome::Error(cause) => write!(f, "scan error: {}", cause),
        }
    }
}
