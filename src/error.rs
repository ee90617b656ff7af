//! Error types for LexAudit.
//!
//! All errors in LexAudit are strongly typed using thiserror.
//! Structural problems with input norms surface as [`ValidationError`] and
//! fail the whole batch. A conflict the canon cascade cannot decide surfaces
//! as [`ConfigurationError`] and only fails that one conflict.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::conflict::{Canon, ConflictId};
use crate::norm::NormId;

/// Validation errors raised at the norm-construction boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Interval end precedes its start.
    #[error("Inverted interval: end ({end}) precedes start ({start})")]
    InvertedInterval {
        start: NaiveDate,
        end: NaiveDate,
    },

    /// A norm's validity covers no days.
    #[error("Degenerate interval: start and end are both {date}")]
    DegenerateInterval {
        date: NaiveDate,
    },

    /// Modality text is not recognised.
    #[error("Unknown modality '{value}'")]
    UnknownModality {
        value: String,
    },

    /// Authority level text is not recognised.
    #[error("Unknown authority level '{value}'")]
    UnknownAuthorityLevel {
        value: String,
    },

    /// A norm names a version the corpus does not declare.
    #[error("Version '{version_id}' is not one of the corpus versions")]
    UnknownVersion {
        version_id: String,
    },

    /// The version list repeats an entry.
    #[error("Version '{version_id}' is declared more than once")]
    DuplicateVersion {
        version_id: String,
    },

    /// The version list is empty.
    #[error("Corpus declares no versions")]
    NoVersions,

    /// A required field is absent or blank.
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    /// A score lies outside the unit range.
    #[error("Field '{field}' has value {value} outside [0.0, 1.0]")]
    ScoreOutOfRange {
        field: String,
        value: f64,
    },

    /// Configuration weights are inconsistent.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    /// The same norm appears twice in one corpus.
    #[error("Norm {norm_id} duplicates an earlier record")]
    DuplicateNorm {
        norm_id: NormId,
    },

    /// Wraps the error of one batch record with its position.
    #[error("Norm record {index} is invalid: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Wraps this error with the index of the batch record that produced it.
    #[must_use]
    pub fn at_record(self, index: usize) -> Self {
        Self::InvalidRecord {
            index,
            source: Box::new(self),
        }
    }
}

/// A canon cascade could not produce a resolution for a single conflict.
///
/// Fatal for that conflict only; batch resolution records it and moves on.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigurationError {
    /// No canon in the cascade applies.
    #[error("No canon applies to conflict {conflict_id}")]
    NoApplicableCanon {
        conflict_id: ConflictId,
    },

    /// A canon applies but every compared fact ties.
    #[error("Canon {canon} cannot decide conflict {conflict_id}: {reason}")]
    Undecidable {
        conflict_id: ConflictId,
        canon: Canon,
        reason: String,
    },

    /// The conflict was already resolved differently.
    #[error("Conflict {conflict_id} already carries a different resolution")]
    ConflictingResolution {
        conflict_id: ConflictId,
    },
}

/// Top-level error type for LexAudit.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Structural problem with the input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A canon could not decide a conflict.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The configuration file could not be read or parsed.
    #[error("Config file error: {message}")]
    Config {
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },
}

impl AuditError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a canon configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for LexAudit operations.
pub type AuditResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inverted_interval_message() {
        let err = ValidationError::InvertedInterval {
            start: date(2024, 1, 1),
            end: date(2023, 1, 1),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Inverted interval"));
        assert!(msg.contains("2023-01-01"));
    }

    #[test]
    fn test_record_index_wrapping() {
        let err = ValidationError::UnknownModality {
            value: "must-ish".to_string(),
        }
        .at_record(3);
        let msg = format!("{err}");
        assert!(msg.contains("record 3"));
        assert!(msg.contains("must-ish"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_audit_error_from_validation() {
        let err: AuditError = ValidationError::NoVersions.into();
        assert!(err.is_validation());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_audit_error_from_configuration() {
        let err: AuditError = ConfigurationError::NoApplicableCanon {
            conflict_id: ConflictId::from_pair_bytes(b"a", b"b"),
        }
        .into();
        assert!(err.is_configuration());
        assert!(format!("{err}").contains("No canon applies"));
    }

    #[test]
    fn test_audit_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AuditError = json_err.into();
        assert!(matches!(err, AuditError::Serialization { .. }));
    }
}
