use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;

pub type JobId = u64;

/// Audio file to submit for separation.
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content: Bytes,
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Server-assigned result locators returned by an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StemLocators {
    pub vocals: Option<String>,
    pub instrumental: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Server locator, already carrying its `format` query parameter.
    pub locator: String,
    /// File name to store the download under, inside the output directory.
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Submitted {
        job_id: JobId,
        result: Result<StemLocators, TransferError>,
    },
    Progress {
        job_id: JobId,
        percent: i64,
    },
    StreamFailed {
        job_id: JobId,
        error: TransferError,
    },
    Downloaded {
        job_id: JobId,
        stem: String,
        result: Result<PathBuf, TransferError>,
    },
}

/// Human-readable failure with a machine-checkable kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransferError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransferError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    MalformedBody,
    /// The backend answered `success: false`.
    Rejected,
    TooLarge { max_bytes: u64, actual: u64 },
    StreamClosed,
    Io,
}

impl FailureKind {
    /// Rejections are reported by the backend itself; everything else is transport.
    pub fn is_rejection(&self) -> bool {
        matches!(self, FailureKind::Rejected)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedBody => write!(f, "malformed response body"),
            FailureKind::Rejected => write!(f, "rejected by backend"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "upload too large (max {max_bytes}, actual {actual})")
            }
            FailureKind::StreamClosed => write!(f, "stream closed"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
