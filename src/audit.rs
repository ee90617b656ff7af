//! Audit facade: detection, resolution and a reproducible fingerprint.

use serde::Serialize;
use tracing::info;

use crate::config::AuditConfig;
use crate::conflict::Conflict;
use crate::corpus::Corpus;
use crate::detector::ConflictDetector;
use crate::error::AuditError;
use crate::inference::{CanonResolver, ResolutionFailure};
use crate::summary::{ConflictSummary, ResolutionSummary};

/// Output of one audit run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub conflicts: Vec<Conflict>,

    /// Conflicts the canon cascade could not decide.
    pub failures: Vec<ResolutionFailure>,

    /// BLAKE3 hex digest of the serialized conflicts.
    pub fingerprint: String,
}

impl AuditReport {
    /// Counts and severity distribution of the detected conflicts.
    #[must_use]
    pub fn conflict_summary(&self) -> ConflictSummary {
        ConflictSummary::from_conflicts(&self.conflicts)
    }

    /// Canon and confidence breakdown of the attached resolutions.
    #[must_use]
    pub fn resolution_summary(&self) -> ResolutionSummary {
        ResolutionSummary::from_conflicts(&self.conflicts)
    }

    /// Pretty-printed JSON of the whole report.
    pub fn to_json(&self) -> Result<String, AuditError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs detection and resolution with one configuration.
#[derive(Debug)]
pub struct Auditor {
    detector: ConflictDetector,
    resolver: CanonResolver,
}

impl Auditor {
    /// # Errors
    ///
    /// Returns `AuditError::Validation` when the configuration is invalid.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        config.validate()?;
        Ok(Self {
            detector: ConflictDetector::new(config.severity),
            resolver: CanonResolver::standard(config.canons),
        })
    }

    /// Replaces the canon cascade.
    #[must_use]
    pub fn with_resolver(mut self, resolver: CanonResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Detector used by `run`.
    #[must_use]
    pub const fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    /// Canon cascade used by `run`.
    #[must_use]
    pub const fn resolver(&self) -> &CanonResolver {
        &self.resolver
    }

    /// Audits a validated corpus.
    ///
    /// Per-conflict resolution failures land in `AuditReport::failures`.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Serialization` if the conflicts cannot be
    /// serialized for fingerprinting.
    pub fn run(&self, corpus: &Corpus) -> Result<AuditReport, AuditError> {
        let mut conflicts = self.detector.detect(corpus.norms());
        let outcome = self.resolver.resolve_all(&mut conflicts);
        let fingerprint = fingerprint(&conflicts)?;

        info!(
            norms = corpus.len(),
            conflicts = conflicts.len(),
            failures = outcome.failures.len(),
            fingerprint = %fingerprint,
            "audit complete"
        );
        Ok(AuditReport {
            conflicts,
            failures: outcome.failures,
            fingerprint,
        })
    }
}

/// BLAKE3 hex digest of the canonical JSON of `conflicts`.
///
/// # Errors
///
/// Returns `AuditError::Serialization` if serialization fails.
pub fn fingerprint(conflicts: &[Conflict]) -> Result<String, AuditError> {
    let bytes = serde_json::to_vec(conflicts)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
