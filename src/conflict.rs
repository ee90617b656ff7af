//! Conflict and resolution records.
//!
//! Conflicts in LexAudit are explicit objects, not hidden errors. When two
//! versions of a text impose incompatible requirements during a shared
//! window, the detector creates a Conflict record; the canon resolver later
//! attaches exactly one Resolution to it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigurationError;
use crate::norm::{Norm, NormId};
use crate::time::TemporalInterval;

/// Namespace for content-derived conflict identifiers.
const CONFLICT_NAMESPACE: Uuid = Uuid::from_u128(0x0b7e_41c9_2d5a_4e18_a3f6_7c90_e2d4_5b17);

/// Unique identifier for a conflict.
///
/// Derived from the two norm ids, so the same pair always yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictId(Uuid);

impl ConflictId {
    /// Id for the ordered pair `(a, b)`.
    #[must_use]
    pub fn for_pair(a: NormId, b: NormId) -> Self {
        Self::from_pair_bytes(a.as_bytes(), b.as_bytes())
    }

    pub(crate) fn from_pair_bytes(a: &[u8], b: &[u8]) -> Self {
        let mut name = Vec::with_capacity(a.len() + b.len());
        name.extend_from_slice(a);
        name.extend_from_slice(b);
        Self(Uuid::new_v5(&CONFLICT_NAMESPACE, &name))
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The nature of a contradiction between two norms.
///
/// Variants are listed in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Obligation or permission against a prohibition.
    DeonticContradiction,

    /// Same modality but different conditions.
    ConditionInconsistency,

    /// Same modality and conditions but different exceptions.
    ExceptionGap,

    /// The same rule independently re-asserted by two versions.
    TemporalOverlap,
}

impl ConflictType {
    /// All types, in classification priority order.
    pub const ALL: [Self; 4] = [
        Self::DeonticContradiction,
        Self::ConditionInconsistency,
        Self::ExceptionGap,
        Self::TemporalOverlap,
    ];

    /// Canonical serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeonticContradiction => "deontic_contradiction",
            Self::ConditionInconsistency => "condition_inconsistency",
            Self::ExceptionGap => "exception_gap",
            Self::TemporalOverlap => "temporal_overlap",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal interpretive tie-break rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Canon {
    /// Higher authority prevails.
    LexSuperior,

    /// More specific rule prevails.
    LexSpecialis,

    /// Later rule prevails.
    LexPosterior,
}

impl Canon {
    /// Canonical serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LexSuperior => "lex_superior",
            Self::LexSpecialis => "lex_specialis",
            Self::LexPosterior => "lex_posterior",
        }
    }
}

impl fmt::Display for Canon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of the canon cascade for one conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    canon: Canon,
    prevailing_norm_id: NormId,
    prevailing_source_id: String,
    confidence: f64,

    /// Set when the verdict rests on weaker evidence than the canon expects.
    #[serde(default)]
    degraded: bool,

    rationale: String,
}

impl Resolution {
    /// Creates a resolution in favour of `prevailing`.
    ///
    /// Confidence is clamped into `[0, 1]`.
    #[must_use]
    pub fn new(canon: Canon, prevailing: &Norm, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            canon,
            prevailing_norm_id: prevailing.id(),
            prevailing_source_id: prevailing.source_id().to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            degraded: false,
            rationale: rationale.into(),
        }
    }

    /// Marks the resolution as a degraded, low-confidence answer.
    #[must_use]
    pub fn into_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Canon that decided the conflict.
    #[must_use]
    pub const fn canon(&self) -> Canon {
        self.canon
    }

    /// Id of the norm that prevails.
    #[must_use]
    pub const fn prevailing_norm_id(&self) -> NormId {
        self.prevailing_norm_id
    }

    /// Source of the prevailing norm.
    #[must_use]
    pub fn prevailing_source_id(&self) -> &str {
        &self.prevailing_source_id
    }

    /// Confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// True when the verdict rests on weaker evidence.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Human-readable justification.
    #[must_use]
    pub fn rationale(&self) -> &str {
        &self.rationale
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} @ {:.2})",
            self.canon, self.prevailing_source_id, self.confidence
        )?;
        if self.degraded {
            write!(f, " [degraded]")?;
        }
        Ok(())
    }
}

/// A contradiction between two norms from different versions.
///
/// Deserialization re-checks the pair invariants: distinct versions, an id
/// derived from the two norm ids, an overlap equal to the intersection of
/// the two windows, a severity in `[0, 1]`, and a resolution naming one of
/// the two norms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    id: ConflictId,
    norm_a: Norm,
    norm_b: Norm,
    conflict_type: ConflictType,

    /// Days on which both norms are in force.
    overlap: TemporalInterval,

    /// 0.0 to 1.0, higher is more severe.
    severity: f64,

    description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<Resolution>,
}

impl Conflict {
    pub(crate) fn new(
        norm_a: Norm,
        norm_b: Norm,
        conflict_type: ConflictType,
        overlap: TemporalInterval,
        severity: f64,
        description: String,
    ) -> Self {
        Self {
            id: ConflictId::for_pair(norm_a.id(), norm_b.id()),
            norm_a,
            norm_b,
            conflict_type,
            overlap,
            severity: severity.clamp(0.0, 1.0),
            description,
            resolution: None,
        }
    }

    /// Pair-derived identifier.
    #[must_use]
    pub const fn id(&self) -> ConflictId {
        self.id
    }

    /// The norm that appeared first in the input.
    #[must_use]
    pub const fn norm_a(&self) -> &Norm {
        &self.norm_a
    }

    /// The other norm of the pair.
    #[must_use]
    pub const fn norm_b(&self) -> &Norm {
        &self.norm_b
    }

    /// Nature of the conflict.
    #[must_use]
    pub const fn conflict_type(&self) -> ConflictType {
        self.conflict_type
    }

    /// Days on which both norms are in force.
    #[must_use]
    pub const fn overlap(&self) -> &TemporalInterval {
        &self.overlap
    }

    /// Severity in `[0, 1]`.
    #[must_use]
    pub const fn severity(&self) -> f64 {
        self.severity
    }

    /// Human-readable summary.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Attached verdict, if resolved.
    #[must_use]
    pub const fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    /// True once a resolution is attached.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Looks up one of the two norms by id.
    #[must_use]
    pub fn norm(&self, id: NormId) -> Option<&Norm> {
        if self.norm_a.id() == id {
            Some(&self.norm_a)
        } else if self.norm_b.id() == id {
            Some(&self.norm_b)
        } else {
            None
        }
    }

    /// Attaches the resolution.
    ///
    /// Re-attaching an identical resolution is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::ConflictingResolution` if a different
    /// resolution is already attached.
    pub fn attach_resolution(&mut self, resolution: Resolution) -> Result<(), ConfigurationError> {
        match &self.resolution {
            Some(existing) if *existing == resolution => Ok(()),
            Some(_) => Err(ConfigurationError::ConflictingResolution { conflict_id: self.id }),
            None => {
                self.resolution = Some(resolution);
                Ok(())
            }
        }
    }
}

impl<'de> Deserialize<'de> for Conflict {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct Raw {
            id: ConflictId,
            norm_a: Norm,
            norm_b: Norm,
            conflict_type: ConflictType,
            overlap: TemporalInterval,
            severity: f64,
            description: String,
            #[serde(default)]
            resolution: Option<Resolution>,
        }

        let raw = Raw::deserialize(deserializer)?;
        if raw.norm_a.version_id() == raw.norm_b.version_id() {
            return Err(D::Error::custom(format!(
                "conflict pairs two norms of version '{}'",
                raw.norm_a.version_id()
            )));
        }
        let expected = ConflictId::for_pair(raw.norm_a.id(), raw.norm_b.id());
        if raw.id != expected {
            return Err(D::Error::custom(format!(
                "conflict id {} does not match its norm pair (expected {expected})",
                raw.id
            )));
        }
        if raw.norm_a.validity().intersection(raw.norm_b.validity()) != Some(raw.overlap) {
            return Err(D::Error::custom(format!(
                "overlap {} is not the intersection of the two validity windows",
                raw.overlap
            )));
        }
        if !(0.0..=1.0).contains(&raw.severity) {
            return Err(D::Error::custom(format!(
                "severity {} outside [0.0, 1.0]",
                raw.severity
            )));
        }
        if let Some(resolution) = &raw.resolution {
            if raw.norm_a.id() != resolution.prevailing_norm_id()
                && raw.norm_b.id() != resolution.prevailing_norm_id()
            {
                return Err(D::Error::custom(format!(
                    "resolution names norm {}, which is not part of the conflict",
                    resolution.prevailing_norm_id()
                )));
            }
            if !(0.0..=1.0).contains(&resolution.confidence()) {
                return Err(D::Error::custom(format!(
                    "confidence {} outside [0.0, 1.0]",
                    resolution.confidence()
                )));
            }
        }

        Ok(Self {
            id: raw.id,
            norm_a: raw.norm_a,
            norm_b: raw.norm_b,
            conflict_type: raw.conflict_type,
            overlap: raw.overlap,
            severity: raw.severity,
            description: raw.description,
            resolution: raw.resolution,
        })
    }
}
