use std::fmt;

use thiserror::Error;

use crate::dns::ChangeAction;

/// Failure talking to the remote record directory.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("VinylDNS {method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("VinylDNS payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("listing zones: {0}")]
    ListZones(#[source] ClientError),

    #[error("listing record sets for zone {zone_name} ({zone_id}): {source}")]
    ListRecordSets {
        zone_id: String,
        zone_name: String,
        #[source]
        source: ClientError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Why a single change could not be applied.
#[derive(Debug, Error)]
pub enum FailureReason {
    #[error("no managed zone matches the name")]
    UnknownZone,

    #[error("invalid change: {0}")]
    Invalid(String),

    #[error("no existing record set with this name and type")]
    RecordSetNotFound,

    #[error("looking up existing record sets: {0}")]
    Lookup(#[source] ClientError),

    #[error("submission failed: {0}")]
    Submission(#[source] ClientError),
}

#[derive(Debug)]
pub struct ChangeFailure {
    /// Position of the change in the submitted list.
    pub index: usize,
    pub action: ChangeAction,
    pub dns_name: String,
    pub record_type: String,
    pub reason: FailureReason,
}

impl fmt::Display for ChangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {}: {}",
            self.index, self.action, self.record_type, self.dns_name, self.reason
        )
    }
}

/// Aggregate of every change that failed in one `apply_changes` call.
/// Changes not listed here were applied (or would have been, in dry-run).
#[derive(Debug)]
pub struct ApplyError {
    pub total: usize,
    pub failures: Vec<ChangeFailure>,
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} change(s) failed", self.failures.len(), self.total)?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApplyError {}
