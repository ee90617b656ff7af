//! Aggregate statistics and plain-text explanations over audit output.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::conflict::{Canon, Conflict, ConflictType};
use crate::norm::Norm;

/// Counts of conflicts per severity band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    /// 0.8 and above.
    pub critical: usize,
    /// 0.6 up to 0.8.
    pub high: usize,
    /// 0.4 up to 0.6.
    pub medium: usize,
    /// Below 0.4.
    pub low: usize,
}

impl SeverityDistribution {
    fn record(&mut self, severity: f64) {
        if severity >= 0.8 {
            self.critical += 1;
        } else if severity >= 0.6 {
            self.high += 1;
        } else if severity >= 0.4 {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

/// Overview of a set of detected conflicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictSummary {
    /// Number of conflicts.
    pub total: usize,
    /// Conflicts per type.
    pub by_type: BTreeMap<ConflictType, usize>,
    /// Mean severity, 0.0 when empty.
    pub average_severity: f64,
    /// Counts per severity tier.
    pub distribution: SeverityDistribution,
}

impl ConflictSummary {
    /// Summarizes `conflicts`.
    #[must_use]
    pub fn from_conflicts(conflicts: &[Conflict]) -> Self {
        let mut summary = Self {
            total: conflicts.len(),
            ..Self::default()
        };
        if conflicts.is_empty() {
            return summary;
        }

        let mut severity_sum = 0.0;
        for conflict in conflicts {
            *summary.by_type.entry(conflict.conflict_type()).or_insert(0) += 1;
            summary.distribution.record(conflict.severity());
            severity_sum += conflict.severity();
        }
        summary.average_severity = severity_sum / conflicts.len() as f64;
        summary
    }

    /// Conflicts of one type.
    #[must_use]
    pub fn count(&self, conflict_type: ConflictType) -> usize {
        self.by_type.get(&conflict_type).copied().unwrap_or(0)
    }
}

/// Overview of the resolutions attached to a set of conflicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    /// Number of conflicts, resolved or not.
    pub total: usize,
    /// Conflicts carrying a resolution.
    pub resolved: usize,
    /// Resolutions per canon.
    pub by_canon: BTreeMap<Canon, usize>,
    /// Mean confidence over resolved conflicts.
    pub average_confidence: f64,
    /// Confidence 0.8 and above.
    pub high_confidence: usize,
    /// Confidence 0.6 up to 0.8.
    pub medium_confidence: usize,
    /// Confidence below 0.6.
    pub low_confidence: usize,
    /// Resolutions flagged as degraded.
    pub degraded: usize,
}

impl ResolutionSummary {
    /// Summarizes the resolutions attached to `conflicts`.
    #[must_use]
    pub fn from_conflicts(conflicts: &[Conflict]) -> Self {
        let mut summary = Self {
            total: conflicts.len(),
            ..Self::default()
        };

        let mut confidence_sum = 0.0;
        for resolution in conflicts.iter().filter_map(Conflict::resolution) {
            summary.resolved += 1;
            *summary.by_canon.entry(resolution.canon()).or_insert(0) += 1;
            confidence_sum += resolution.confidence();
            match resolution.confidence() {
                c if c >= 0.8 => summary.high_confidence += 1,
                c if c >= 0.6 => summary.medium_confidence += 1,
                _ => summary.low_confidence += 1,
            }
            if resolution.is_degraded() {
                summary.degraded += 1;
            }
        }
        if summary.resolved > 0 {
            summary.average_confidence = confidence_sum / summary.resolved as f64;
        }
        summary
    }

    /// Conflicts still without a resolution.
    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.total - self.resolved
    }
}

/// Resolved conflicts ordered by `severity × confidence`, highest first.
///
/// Ties fall back to conflict id so the order is reproducible.
#[must_use]
pub fn rank_resolutions(conflicts: &[Conflict]) -> Vec<&Conflict> {
    let mut ranked: Vec<(&Conflict, f64)> = conflicts
        .iter()
        .filter_map(|c| c.resolution().map(|r| (c, c.severity() * r.confidence())))
        .collect();
    ranked.sort_by(|(x, sx), (y, sy)| sy.total_cmp(sx).then_with(|| x.id().cmp(&y.id())));
    ranked.into_iter().map(|(c, _)| c).collect()
}

fn describe_norm(out: &mut String, heading: &str, norm: &Norm) {
    let _ = writeln!(
        out,
        "{heading}: {} {} '{}' [{} {}, source {}, {}]",
        norm.subject(),
        norm.modality(),
        norm.action(),
        norm.version_id(),
        norm.validity(),
        norm.source_id(),
        norm.authority_level(),
    );
}

/// Fixed-template explanation of one conflict and its resolution.
#[must_use]
pub fn explain_resolution(conflict: &Conflict) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Conflict {} ({}, severity {:.2})",
        conflict.id(),
        conflict.conflict_type(),
        conflict.severity()
    );
    let _ = writeln!(out, "{}", conflict.description());
    describe_norm(&mut out, "Norm A", conflict.norm_a());
    describe_norm(&mut out, "Norm B", conflict.norm_b());

    match conflict.resolution() {
        Some(resolution) => {
            let winner = if conflict.norm_a().id() == resolution.prevailing_norm_id() {
                "Norm A"
            } else {
                "Norm B"
            };
            let _ = writeln!(
                out,
                "Resolution: {} prevails by {} (confidence {:.2}{})",
                winner,
                resolution.canon(),
                resolution.confidence(),
                if resolution.is_degraded() { ", degraded" } else { "" }
            );
            let _ = write!(out, "Rationale: {}", resolution.rationale());
        }
        None => {
            let _ = write!(out, "Resolution: none");
        }
    }
    out
}
