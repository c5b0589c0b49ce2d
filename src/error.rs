//! Crate-wide error type.
//!
//! Every failure is raised at the point of detection; the core never falls
//! back to a partial result on its own. Callers that want leniency ask for it
//! explicitly through [`Strictness::Lenient`](crate::config::Strictness).
use thiserror::Error;

use crate::channels::Montage;

/// Errors produced by the standardization engine and the annotation model.
#[derive(Error, Debug)]
pub enum Error {
    /// A requested channel is absent from the recording and no alias matches.
    #[error("channel `{name}` not found (available: {})", available.join(", "))]
    ChannelNotFound {
        /// Canonical name that was looked up.
        name: String,
        /// Labels present in the recording.
        available: Vec<String>,
    },

    /// Channel selection could not satisfy the full target list.
    #[error("missing channels: {}", .0.join(", "))]
    MissingChannels(Vec<String>),

    /// The operation requires a montage the signal does not have.
    #[error("operation requires a {required} montage, signal is {actual}")]
    InvalidMontage {
        /// Montage the operation accepts.
        required: Montage,
        /// Montage of the signal it was called on.
        actual: Montage,
    },

    /// Event label outside the seizure taxonomy.
    #[error("unknown event type `{0}`")]
    UnknownEventType(String),

    /// An annotation TSV row violates the serialization contract.
    #[error("malformed annotation row at line {line}: {reason}")]
    MalformedAnnotationRow {
        /// 1-based line number in the file (the header is line 1).
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// Annotation records passed to a constructor break a data-model invariant.
    #[error("invalid annotation: {0}")]
    InvalidAnnotation(String),

    /// Sample matrix, channel list or sampling rate are inconsistent.
    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    /// EDF container could not be read or written.
    #[error("EDF: {0}")]
    Edf(String),

    /// Tabular export could not be read or written.
    #[error("tabular: {0}")]
    Tabular(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Shorthand for `std::result::Result<T, eegstd::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
