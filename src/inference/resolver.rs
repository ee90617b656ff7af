use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CanonConfig;
use crate::conflict::{Canon, Conflict, ConflictId, Resolution};
use crate::error::ConfigurationError;
use crate::inference::canons::{CanonRule, LexPosterior, LexSpecialis, LexSuperior};

/// Ordered canon cascade. The first rule that applies decides.
pub struct CanonResolver {
    rules: Vec<Box<dyn CanonRule>>,
    config: CanonConfig,
}

impl CanonResolver {
    /// A resolver with no rules. Every conflict fails with
    /// `NoApplicableCanon` until rules are added.
    #[must_use]
    pub fn empty(config: CanonConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    /// Lex Superior, then Lex Specialis, then Lex Posterior.
    #[must_use]
    pub fn standard(config: CanonConfig) -> Self {
        Self::empty(config)
            .with_rule(LexSuperior)
            .with_rule(LexSpecialis)
            .with_rule(LexPosterior)
    }

    /// Appends a rule at the lowest priority.
    #[must_use]
    pub fn with_rule(mut self, rule: impl CanonRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CanonConfig {
        &self.config
    }

    /// Canons in evaluation order.
    #[must_use]
    pub fn canons(&self) -> Vec<Canon> {
        self.rules.iter().map(|r| r.canon()).collect()
    }

    /// Resolves one conflict without modifying it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::NoApplicableCanon` when no rule applies,
    /// or the deciding rule's `Undecidable` error.
    pub fn resolve(&self, conflict: &Conflict) -> Result<Resolution, ConfigurationError> {
        let rule = self
            .rules
            .iter()
            .find(|r| r.applies(conflict, &self.config))
            .ok_or(ConfigurationError::NoApplicableCanon {
                conflict_id: conflict.id(),
            })?;

        let resolution = rule.resolve(conflict, &self.config)?;
        debug!(
            conflict_id = %conflict.id(),
            canon = %resolution.canon(),
            prevailing = %resolution.prevailing_norm_id(),
            confidence = resolution.confidence(),
            "canon applied"
        );
        if resolution.is_degraded() {
            warn!(
                conflict_id = %conflict.id(),
                canon = %resolution.canon(),
                rationale = resolution.rationale(),
                "degraded resolution"
            );
        }
        Ok(resolution)
    }

    /// Resolves and attaches a resolution to every conflict.
    ///
    /// A failure on one conflict is recorded and does not stop the rest.
    pub fn resolve_all(&self, conflicts: &mut [Conflict]) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::default();

        for conflict in conflicts.iter_mut() {
            let attached = self
                .resolve(conflict)
                .and_then(|resolution| conflict.attach_resolution(resolution));
            match attached {
                Ok(()) => outcome.resolved += 1,
                Err(error) => {
                    warn!(conflict_id = %conflict.id(), error = %error, "conflict left unresolved");
                    outcome.failures.push(ResolutionFailure {
                        conflict_id: conflict.id(),
                        error,
                    });
                }
            }
        }

        info!(
            resolved = outcome.resolved,
            failed = outcome.failures.len(),
            "batch resolution complete"
        );
        outcome
    }
}

impl Default for CanonResolver {
    fn default() -> Self {
        Self::standard(CanonConfig::default())
    }
}

impl fmt::Debug for CanonResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonResolver")
            .field("rules", &self.canons())
            .field("config", &self.config)
            .finish()
    }
}

/// One conflict the cascade could not decide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionFailure {
    pub conflict_id: ConflictId,
    pub error: ConfigurationError,
}

/// Result of a batch resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionOutcome {
    pub resolved: usize,
    pub failures: Vec<ResolutionFailure>,
}

impl ResolutionOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Ids of the conflicts left unresolved, in batch order.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<ConflictId> {
        self.failures.iter().map(|f| f.conflict_id).collect()
    }
}
