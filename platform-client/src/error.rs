use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlatformErrorKind {
    #[error("transport failure")]
    Transport,
    #[error("unexpected HTTP status")]
    UnexpectedStatus,
    #[error("response body did not match the expected shape")]
    Decode,
}

/// Structured failure from a platform client call: status (if any), the raw
/// body truncated for forensics, and a small context map describing which
/// operation/host/parameters produced it.
#[derive(Debug, Error)]
#[error("platform error: {kind} (status={status:?}, context={context:?})")]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub status: Option<u16>,
    pub raw_body: String,
    pub context: BTreeMap<String, String>,
}

impl PlatformError {
    pub fn transport(context: BTreeMap<String, String>, message: impl Into<String>) -> Self {
        Self { kind: PlatformErrorKind::Transport, status: None, raw_body: message.into(), context }
    }

    pub fn unexpected_status(status: u16, raw_body: impl Into<String>, context: BTreeMap<String, String>) -> Self {
        Self { kind: PlatformErrorKind::UnexpectedStatus, status: Some(status), raw_body: raw_body.into(), context }
    }

    pub fn decode(status: u16, raw_body: impl Into<String>, context: BTreeMap<String, String>) -> Self {
        Self { kind: PlatformErrorKind::Decode, status: Some(status), raw_body: raw_body.into(), context }
    }

    /// Status and up-to-500-char body, the shape persisted into
    /// `AvailabilityResult.errorMessage` on a failed probe.
    pub fn as_error_message(&self) -> String {
        let mut body = self.raw_body.clone();
        body.truncate(500);
        format!("{}:{}", self.status.map(|s| s.to_string()).unwrap_or_else(|| "none".into()), body)
    }
}

pub fn context(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
