//! Error types for the BatchJob operator
//!
//! Errors carry the job identity they concern so that log lines and HTTP
//! responses point at the affected BatchJob.

use thiserror::Error;

use crate::JobKey;

/// Main error type for BatchJob operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Lookup miss on the queue, a BatchJob, or a SparkApplication
    #[error("{kind} {key} not found")]
    NotFound {
        /// What was looked up (e.g. "queue entry", "BatchJob")
        kind: &'static str,
        /// Identity that was looked up
        key: JobKey,
    },

    /// Enqueue of a job that is already queued
    #[error("job {key} is already queued")]
    DuplicateEntry {
        /// Identity that was already present
        key: JobKey,
    },

    /// Status write lost the optimistic-concurrency race too many times
    #[error("status update for {key} conflicted {attempts} times")]
    ConflictExhausted {
        /// Job whose status could not be written
        key: JobKey,
        /// Number of attempts made
        attempts: u32,
    },

    /// SparkApplication creation was rejected
    #[error("submission of {key} failed: {message}")]
    Submission {
        /// Job that failed to submit
        key: JobKey,
        /// Reason reported by the API server
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Malformed input (CRD spec or HTTP payload)
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Where the error occurred (e.g. "reconciler", "extender")
        context: String,
    },
}

impl Error {
    /// Create a not-found error
    pub fn not_found(kind: &'static str, key: &JobKey) -> Self {
        Self::NotFound {
            kind,
            key: key.clone(),
        }
    }

    /// Create a submission error
    pub fn submission(key: &JobKey, msg: impl Into<String>) -> Self {
        Self::Submission {
            key: key.clone(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// True for lookup misses
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube { source } => is_status(source, 404),
            _ => false,
        }
    }

    /// True when the API server rejected a write because the object changed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube { source } if is_status(source, 409))
    }

    /// Check if this error is retryable
    ///
    /// Transport failures and 5xx responses are transient. Conflicts are
    /// retryable because the next attempt re-reads the object. Domain errors
    /// and other 4xx responses need a change in input first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) if ae.code == 409 => true,
                kube::Error::Api(ae) => !(400..500).contains(&ae.code),
                _ => true,
            },
            Error::ConflictExhausted { .. } => true,
            Error::Internal { .. } => true,
            Error::NotFound { .. }
            | Error::DuplicateEntry { .. }
            | Error::Submission { .. }
            | Error::Serialization { .. }
            | Error::Validation { .. } => false,
        }
    }

    /// The job this error concerns, if any
    pub fn key(&self) -> Option<&JobKey> {
        match self {
            Error::NotFound { key, .. }
            | Error::DuplicateEntry { key }
            | Error::ConflictExhausted { key, .. }
            | Error::Submission { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == code)
}

#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} (test)"),
        reason: reason.to_string(),
        code,
    })
}
