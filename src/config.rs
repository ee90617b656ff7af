//! Scoring weights for detection, resolution and specificity.
//!
//! Every numeric constant the engine uses lives here so a run is fully
//! described by its input norms plus one `AuditConfig`. Defaults reproduce
//! the documented bands; any field may be overridden from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictType;
use crate::error::{AuditError, ValidationError};

/// Severity range for one conflict type.
///
/// A conflict whose overlap covers none of the shorter norm's window scores
/// `min`, one covering half of it scores `base`, and one covering all of it
/// scores `max`. Values between are linearly interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBand {
    /// Severity at zero coverage.
    pub min: f64,
    /// Severity at half coverage.
    pub base: f64,
    /// Severity at full coverage.
    pub max: f64,
}

impl SeverityBand {
    /// Creates a band from its three anchor points.
    #[must_use]
    pub const fn new(min: f64, base: f64, max: f64) -> Self {
        Self { min, base, max }
    }

    /// Interpolates within the band for a coverage ratio in `[0, 1]`.
    #[must_use]
    pub fn at(&self, coverage: f64) -> f64 {
        let coverage = coverage.clamp(0.0, 1.0);
        if coverage <= 0.5 {
            self.min + (self.base - self.min) * (coverage / 0.5)
        } else {
            self.base + (self.max - self.base) * ((coverage - 0.5) / 0.5)
        }
    }

    fn validate(&self, name: &str) -> Result<(), ValidationError> {
        let ordered = 0.0 <= self.min
            && self.min <= self.base
            && self.base <= self.max
            && self.max <= 1.0;
        if !ordered {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "severity band '{name}' must satisfy 0 <= min <= base <= max <= 1 (got {}/{}/{})",
                    self.min, self.base, self.max
                ),
            });
        }
        Ok(())
    }
}

/// Severity weights used by the conflict detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    /// Added when the two norms come from instruments of different rank.
    pub authority_bonus: f64,

    /// Conflicts scoring below this are not reported.
    pub min_severity: f64,

    /// Band for opposing modalities.
    pub deontic_contradiction: SeverityBand,
    /// Band for restatements with identical scope.
    pub temporal_overlap: SeverityBand,
    /// Band for differing conditions.
    pub condition_inconsistency: SeverityBand,
    /// Band for differing exceptions.
    pub exception_gap: SeverityBand,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            authority_bonus: 0.05,
            min_severity: 0.30,
            deontic_contradiction: SeverityBand::new(0.80, 0.85, 1.00),
            temporal_overlap: SeverityBand::new(0.60, 0.70, 0.90),
            condition_inconsistency: SeverityBand::new(0.40, 0.55, 0.70),
            exception_gap: SeverityBand::new(0.30, 0.45, 0.60),
        }
    }
}

impl SeverityConfig {
    /// Band for a conflict type.
    #[must_use]
    pub const fn band(&self, conflict_type: ConflictType) -> &SeverityBand {
        match conflict_type {
            ConflictType::DeonticContradiction => &self.deontic_contradiction,
            ConflictType::TemporalOverlap => &self.temporal_overlap,
            ConflictType::ConditionInconsistency => &self.condition_inconsistency,
            ConflictType::ExceptionGap => &self.exception_gap,
        }
    }

    /// Scores a conflict.
    ///
    /// The band position follows the coverage ratio; the authority bonus is
    /// added afterwards and the result is clamped back into the band.
    #[must_use]
    pub fn score(&self, conflict_type: ConflictType, coverage: f64, authority_differs: bool) -> f64 {
        let band = self.band(conflict_type);
        let mut severity = band.at(coverage);
        if authority_differs {
            severity += self.authority_bonus;
        }
        severity.max(band.min).min(band.max).clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.deontic_contradiction.validate("deontic_contradiction")?;
        self.temporal_overlap.validate("temporal_overlap")?;
        self.condition_inconsistency.validate("condition_inconsistency")?;
        self.exception_gap.validate("exception_gap")?;
        check_unit("severity.authority_bonus", self.authority_bonus)?;
        check_unit("severity.min_severity", self.min_severity)
    }
}

/// Weights used by the canon cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonConfig {
    /// Confidence of a Lex Superior decision.
    pub superior_confidence: f64,

    /// Lex Specialis fires only when the specificity gap exceeds this.
    pub specialis_threshold: f64,

    /// Lex Specialis confidence is `floor + slope * min(gap, cap)`.
    pub specialis_floor: f64,
    /// Confidence gained per unit of gap.
    pub specialis_slope: f64,
    /// Gap beyond which confidence stops rising.
    pub specialis_cap: f64,

    /// Confidence of a Lex Posterior decision based on enactment dates.
    pub posterior_confidence: f64,

    /// Confidence when enactment dates are missing.
    pub degraded_confidence: f64,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            superior_confidence: 0.90,
            specialis_threshold: 0.3,
            specialis_floor: 0.60,
            specialis_slope: 0.5,
            specialis_cap: 0.5,
            posterior_confidence: 0.85,
            degraded_confidence: 0.55,
        }
    }
}

impl CanonConfig {
    /// Lex Specialis confidence for a specificity gap.
    #[must_use]
    pub fn specialis_confidence(&self, gap: f64) -> f64 {
        (self.specialis_floor + self.specialis_slope * gap.min(self.specialis_cap)).clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_unit("canons.superior_confidence", self.superior_confidence)?;
        check_unit("canons.specialis_threshold", self.specialis_threshold)?;
        check_unit("canons.specialis_floor", self.specialis_floor)?;
        check_unit("canons.specialis_slope", self.specialis_slope)?;
        check_unit("canons.specialis_cap", self.specialis_cap)?;
        check_unit("canons.posterior_confidence", self.posterior_confidence)?;
        check_unit("canons.degraded_confidence", self.degraded_confidence)
    }
}

/// Weight table for deriving a norm's specificity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecificityConfig {
    /// Score of a norm with no scope qualifiers.
    pub base: f64,
    /// Awarded when the norm carries conditions.
    pub conditions: f64,
    /// Awarded when the norm lists exceptions.
    pub exceptions: f64,
    /// Awarded when the norm names an object.
    pub object: f64,

    /// Awarded when the norm's window is narrower than the corpus-wide span.
    pub narrow_window: f64,
}

impl Default for SpecificityConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            conditions: 0.2,
            exceptions: 0.1,
            object: 0.1,
            narrow_window: 0.1,
        }
    }
}

impl SpecificityConfig {
    /// Sums the applicable weights, clipped to `[0, 1]`.
    #[must_use]
    pub fn score(
        &self,
        has_conditions: bool,
        has_exceptions: bool,
        has_object: bool,
        narrow_window: bool,
    ) -> f64 {
        let mut score = self.base;
        if has_conditions {
            score += self.conditions;
        }
        if has_exceptions {
            score += self.exceptions;
        }
        if has_object {
            score += self.object;
        }
        if narrow_window {
            score += self.narrow_window;
        }
        score.clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_unit("specificity.base", self.base)?;
        check_unit("specificity.conditions", self.conditions)?;
        check_unit("specificity.exceptions", self.exceptions)?;
        check_unit("specificity.object", self.object)?;
        check_unit("specificity.narrow_window", self.narrow_window)
    }
}

/// Complete configuration of an audit run.
///
/// # Examples
///
/// ```
/// use lexaudit::AuditConfig;
///
/// let config = AuditConfig::from_toml_str(
///     r#"
///     [severity]
///     min_severity = 0.5
///
///     [canons]
///     specialis_threshold = 0.25
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.severity.min_severity, 0.5);
/// assert_eq!(config.canons.posterior_confidence, 0.85);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// `[severity]` table.
    pub severity: SeverityConfig,
    /// `[canons]` table.
    pub canons: CanonConfig,
    /// `[specificity]` table.
    pub specificity: SpecificityConfig,
}

impl AuditConfig {
    /// Parses and validates a TOML document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Config` on malformed TOML and
    /// `AuditError::Validation` when a weight is out of range.
    pub fn from_toml_str(input: &str) -> Result<Self, AuditError> {
        let config: Self = toml::from_str(input).map_err(|e| AuditError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| AuditError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&input)
    }

    /// Serializes this configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String, AuditError> {
        toml::to_string(self).map_err(|e| AuditError::Config {
            message: e.to_string(),
        })
    }

    /// Checks every band and weight.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.severity.validate()?;
        self.canons.validate()?;
        self.specificity.validate()
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidConfig {
            reason: format!("{field} must be a finite value in [0, 1] (got {value})"),
        });
    }
    Ok(())
}
