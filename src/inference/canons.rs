//! The three interpretive canons.
//!
//! Each canon is a [`CanonRule`]: a predicate saying whether it applies to a
//! conflict, and a resolver producing the verdict when it does. The cascade
//! in [`super::CanonResolver`] evaluates rules in priority order.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::config::CanonConfig;
use crate::conflict::{Canon, Conflict, Resolution};
use crate::error::ConfigurationError;
use crate::norm::Norm;

/// Authority ordering quoted by Lex Superior rationales.
pub const AUTHORITY_ORDERING: &str = "Constitution > Statute > Regulation > Guidance";

/// Score differences within this margin count as equal.
const SCORE_TOLERANCE: f64 = 1e-9;

/// One interpretive tie-break rule.
///
/// Implementations must be deterministic: the same conflict and config must
/// always yield the same answer.
pub trait CanonRule: Send + Sync {
    /// Which canon this rule applies.
    fn canon(&self) -> Canon;

    /// True when this rule can decide the conflict.
    fn applies(&self, conflict: &Conflict, config: &CanonConfig) -> bool;

    /// Decides the conflict.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Undecidable` when the facts this rule
    /// compares are tied.
    fn resolve(&self, conflict: &Conflict, config: &CanonConfig) -> Result<Resolution, ConfigurationError>;
}

fn label(norm: &Norm) -> String {
    format!("{} (source {})", norm.version_id(), norm.source_id())
}

fn undecidable(conflict: &Conflict, canon: Canon, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Undecidable {
        conflict_id: conflict.id(),
        canon,
        reason: reason.into(),
    }
}

/// Higher authority prevails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexSuperior;

impl CanonRule for LexSuperior {
    fn canon(&self) -> Canon {
        Canon::LexSuperior
    }

    fn applies(&self, conflict: &Conflict, _config: &CanonConfig) -> bool {
        conflict.norm_a().authority_level() != conflict.norm_b().authority_level()
    }

    fn resolve(&self, conflict: &Conflict, config: &CanonConfig) -> Result<Resolution, ConfigurationError> {
        let (a, b) = (conflict.norm_a(), conflict.norm_b());
        let (winner, loser) = match a.authority_level().cmp(&b.authority_level()) {
            Ordering::Greater => (a, b),
            Ordering::Less => (b, a),
            Ordering::Equal => {
                return Err(undecidable(
                    conflict,
                    self.canon(),
                    format!("both norms have authority {}", a.authority_level()),
                ))
            }
        };
        let rationale = format!(
            "Lex Superior: {} ({}) prevails over {} ({}) under the authority ordering {AUTHORITY_ORDERING}",
            label(winner),
            winner.authority_level(),
            label(loser),
            loser.authority_level(),
        );
        Ok(Resolution::new(
            self.canon(),
            winner,
            config.superior_confidence,
            rationale,
        ))
    }
}

/// More specific norm prevails when the specificity gap is decisive.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexSpecialis;

impl LexSpecialis {
    fn gap(conflict: &Conflict) -> f64 {
        (conflict.norm_a().specificity_score() - conflict.norm_b().specificity_score()).abs()
    }
}

impl CanonRule for LexSpecialis {
    fn canon(&self) -> Canon {
        Canon::LexSpecialis
    }

    fn applies(&self, conflict: &Conflict, config: &CanonConfig) -> bool {
        Self::gap(conflict) - config.specialis_threshold > SCORE_TOLERANCE
    }

    fn resolve(&self, conflict: &Conflict, config: &CanonConfig) -> Result<Resolution, ConfigurationError> {
        let (a, b) = (conflict.norm_a(), conflict.norm_b());
        let (winner, loser) = match a.specificity_score().total_cmp(&b.specificity_score()) {
            Ordering::Greater => (a, b),
            Ordering::Less => (b, a),
            Ordering::Equal => {
                return Err(undecidable(
                    conflict,
                    self.canon(),
                    format!("both norms have specificity {:.2}", a.specificity_score()),
                ))
            }
        };
        let gap = Self::gap(conflict);
        let rationale = format!(
            "Lex Specialis: {} (specificity {:.2}) prevails over {} (specificity {:.2}); gap {gap:.2} exceeds threshold {:.2}",
            label(winner),
            winner.specificity_score(),
            label(loser),
            loser.specificity_score(),
            config.specialis_threshold,
        );
        Ok(Resolution::new(
            self.canon(),
            winner,
            config.specialis_confidence(gap),
            rationale,
        ))
    }
}

/// Later norm prevails. Always applies; the cascade's fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexPosterior;

impl LexPosterior {
    fn later<'a>(a: &'a Norm, b: &'a Norm, key: fn(&Norm) -> NaiveDate) -> Option<(&'a Norm, &'a Norm)> {
        match key(a).cmp(&key(b)) {
            Ordering::Greater => Some((a, b)),
            Ordering::Less => Some((b, a)),
            Ordering::Equal => None,
        }
    }

    fn effective(norm: &Norm) -> NaiveDate {
        norm.validity().start()
    }
}

impl CanonRule for LexPosterior {
    fn canon(&self) -> Canon {
        Canon::LexPosterior
    }

    fn applies(&self, _conflict: &Conflict, _config: &CanonConfig) -> bool {
        true
    }

    fn resolve(&self, conflict: &Conflict, config: &CanonConfig) -> Result<Resolution, ConfigurationError> {
        let (a, b) = (conflict.norm_a(), conflict.norm_b());

        let (Some(enacted_a), Some(enacted_b)) = (a.enactment_date(), b.enactment_date()) else {
            let missing: Vec<String> = [a, b]
                .into_iter()
                .filter(|n| n.enactment_date().is_none())
                .map(label)
                .collect();
            let (winner, loser) = Self::later(a, b, Self::effective).ok_or_else(|| {
                undecidable(
                    conflict,
                    self.canon(),
                    format!(
                        "enactment date missing for {} and both take effect on {}",
                        missing.join(" and "),
                        a.validity().start()
                    ),
                )
            })?;
            let rationale = format!(
                "Lex Posterior (degraded basis): enactment date missing for {}; {} prevails over {} because it takes effect later ({} vs {})",
                missing.join(" and "),
                label(winner),
                label(loser),
                Self::effective(winner),
                Self::effective(loser),
            );
            return Ok(
                Resolution::new(self.canon(), winner, config.degraded_confidence, rationale)
                    .into_degraded(),
            );
        };

        if enacted_a != enacted_b {
            let ((winner, enacted_w), (loser, enacted_l)) = if enacted_a > enacted_b {
                ((a, enacted_a), (b, enacted_b))
            } else {
                ((b, enacted_b), (a, enacted_a))
            };
            let rationale = format!(
                "Lex Posterior: {} (enacted {enacted_w}) prevails over {} (enacted {enacted_l}) as the later enactment",
                label(winner),
                label(loser),
            );
            return Ok(Resolution::new(
                self.canon(),
                winner,
                config.posterior_confidence,
                rationale,
            ));
        }

        let (winner, loser) = Self::later(a, b, Self::effective).ok_or_else(|| {
            undecidable(
                conflict,
                self.canon(),
                format!(
                    "both norms were enacted on {enacted_a} and take effect on {}",
                    a.validity().start()
                ),
            )
        })?;
        let rationale = format!(
            "Lex Posterior: both norms enacted on {enacted_a}; {} prevails over {} because it takes effect later ({} vs {})",
            label(winner),
            label(loser),
            Self::effective(winner),
            Self::effective(loser),
        );
        Ok(Resolution::new(
            self.canon(),
            winner,
            config.posterior_confidence,
            rationale,
        ))
    }
}
