//! Conflict detection.
//!
//! Norms are grouped by their normalized `(subject, action)` key and every
//! cross-version pair inside a group whose validity windows overlap is
//! classified and scored. Detection is pure: no clock reads, no randomness,
//! and output order depends only on input order.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::config::SeverityConfig;
use crate::conflict::{Conflict, ConflictType};
use crate::norm::Norm;
use crate::time::TemporalInterval;

/// Finds intertemporal conflicts in a set of norms.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    config: SeverityConfig,
}

impl ConflictDetector {
    /// Creates a detector with the given severity weights.
    #[must_use]
    pub const fn new(config: SeverityConfig) -> Self {
        Self { config }
    }

    /// Severity weights in use.
    #[must_use]
    pub const fn config(&self) -> &SeverityConfig {
        &self.config
    }

    /// Detects every conflict in `norms`.
    ///
    /// Groups are visited in key order and pairs in input order within a
    /// group, so identical input always produces the identical list. In each
    /// pair `norm_a` is the norm that appears first in `norms`. A norm
    /// repeated verbatim is only considered once.
    #[must_use]
    pub fn detect(&self, norms: &[Norm]) -> Vec<Conflict> {
        let mut seen = BTreeSet::new();
        let mut groups: BTreeMap<(String, String), Vec<&Norm>> = BTreeMap::new();
        for norm in norms {
            if !seen.insert(norm.id()) {
                debug!(norm_id = %norm.id(), "skipping repeated norm");
                continue;
            }
            groups.entry(norm.group_key()).or_default().push(norm);
        }

        let mut conflicts = Vec::new();
        for group in groups.values() {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if let Some(conflict) = self.compare(a, b) {
                        debug!(
                            conflict_id = %conflict.id(),
                            conflict_type = %conflict.conflict_type(),
                            severity = conflict.severity(),
                            overlap = %conflict.overlap(),
                            "conflict detected"
                        );
                        conflicts.push(conflict);
                    }
                }
            }
        }

        info!(
            norms = norms.len(),
            groups = groups.len(),
            conflicts = conflicts.len(),
            "conflict detection complete"
        );
        conflicts
    }

    /// Compares one pair; `None` when the pair does not conflict or scores
    /// under the reporting threshold.
    fn compare(&self, a: &Norm, b: &Norm) -> Option<Conflict> {
        if a.version_id() == b.version_id() {
            return None;
        }
        let overlap = a.validity().intersection(b.validity())?;

        let conflict_type = classify(a, b)?;
        let severity = self.config.score(
            conflict_type,
            coverage(&overlap, a.validity(), b.validity()),
            a.authority_level() != b.authority_level(),
        );
        if severity < self.config.min_severity {
            debug!(
                conflict_type = %conflict_type,
                severity,
                "pair below reporting threshold"
            );
            return None;
        }

        let description = describe(conflict_type, a, b, &overlap);
        Some(Conflict::new(
            a.clone(),
            b.clone(),
            conflict_type,
            overlap,
            severity,
            description,
        ))
    }
}

/// Classifies a pair in fixed priority order.
///
/// Opposing modalities always conflict. Otherwise the pair must share a
/// modality: an obligation restated as a permission is compatible and
/// yields `None`.
#[must_use]
pub fn classify(a: &Norm, b: &Norm) -> Option<ConflictType> {
    if a.modality().contradicts(b.modality()) {
        Some(ConflictType::DeonticContradiction)
    } else if a.modality() != b.modality() {
        None
    } else if !a.same_conditions(b) {
        Some(ConflictType::ConditionInconsistency)
    } else if !a.same_exceptions(b) {
        Some(ConflictType::ExceptionGap)
    } else {
        Some(ConflictType::TemporalOverlap)
    }
}

/// Share of the shorter-lived norm's window covered by the overlap.
///
/// Unbounded durations count as infinite; two unbounded norms cover each
/// other fully.
fn coverage(overlap: &TemporalInterval, a: &TemporalInterval, b: &TemporalInterval) -> f64 {
    let shortest = match (a.duration_days(), b.duration_days()) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    };
    match (overlap.duration_days(), shortest) {
        (Some(days), Some(shortest)) if shortest > 0 => {
            (days as f64 / shortest as f64).clamp(0.0, 1.0)
        }
        _ => 1.0,
    }
}

fn describe(conflict_type: ConflictType, a: &Norm, b: &Norm, overlap: &TemporalInterval) -> String {
    let side_a = format!("{} (source {})", a.version_id(), a.source_id());
    let side_b = format!("{} (source {})", b.version_id(), b.source_id());
    match conflict_type {
        ConflictType::DeonticContradiction => format!(
            "Deontic contradiction: '{}' is {} under {side_a} but {} under {side_b} during {overlap}",
            a.action(),
            a.modality().verb(),
            b.modality().verb(),
        ),
        ConflictType::ConditionInconsistency => format!(
            "Condition inconsistency: '{}' is conditioned on {} under {side_a} but on {} under {side_b} during {overlap}",
            a.action(),
            quote_or(a.conditions(), "no condition"),
            quote_or(b.conditions(), "no condition"),
        ),
        ConflictType::ExceptionGap => format!(
            "Exception gap: '{}' exempts {} under {side_a} but {} under {side_b} during {overlap}",
            a.action(),
            list_exceptions(a.exceptions()),
            list_exceptions(b.exceptions()),
        ),
        ConflictType::TemporalOverlap => format!(
            "Temporal overlap: '{}' is {} under both {side_a} and {side_b} during {overlap}",
            a.action(),
            a.modality().verb(),
        ),
    }
}

fn quote_or(text: Option<&str>, absent: &str) -> String {
    text.map_or_else(|| absent.to_string(), |t| format!("'{t}'"))
}

fn list_exceptions(exceptions: &BTreeSet<String>) -> String {
    if exceptions.is_empty() {
        "nothing".to_string()
    } else {
        let quoted: Vec<String> = exceptions.iter().map(|e| format!("'{e}'")).collect();
        quoted.join(", ")
    }
}

/// Selection criteria over detected conflicts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictFilter {
    /// Keep conflicts at or above this severity.
    pub min_severity: Option<f64>,

    /// Keep only these types; empty keeps all.
    pub types: BTreeSet<ConflictType>,
}

impl ConflictFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only conflicts at or above `min_severity`.
    #[must_use]
    pub fn with_min_severity(mut self, min_severity: f64) -> Self {
        self.min_severity = Some(min_severity);
        self
    }

    /// Adds a type to keep.
    #[must_use]
    pub fn with_type(mut self, conflict_type: ConflictType) -> Self {
        self.types.insert(conflict_type);
        self
    }

    /// True when `conflict` passes every criterion.
    #[must_use]
    pub fn matches(&self, conflict: &Conflict) -> bool {
        let severe_enough = self
            .min_severity
            .map_or(true, |min| conflict.severity() >= min);
        let type_ok = self.types.is_empty() || self.types.contains(&conflict.conflict_type());
        severe_enough && type_ok
    }
}

/// Conflicts matching `filter`, in their original order.
#[must_use]
pub fn filter_conflicts<'a>(conflicts: &'a [Conflict], filter: &ConflictFilter) -> Vec<&'a Conflict> {
    conflicts.iter().filter(|c| filter.matches(c)).collect()
}

/// Orders conflicts by severity, most severe first; ties by id.
pub fn rank_conflicts(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|x, y| {
        y.severity()
            .total_cmp(&x.severity())
            .then_with(|| x.id().cmp(&y.id()))
    });
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::norm::{AuthorityLevel, Modality, NormBuilder};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window(start: NaiveDate, end: Option<NaiveDate>) -> TemporalInterval {
        TemporalInterval::new(start, end).unwrap()
    }

    fn builder(version: &str, modality: Modality, validity: TemporalInterval) -> NormBuilder {
        Norm::builder()
            .modality(modality)
            .subject("operator")
            .action("disclose")
            .validity(validity)
            .source_id(format!("s-{version}"))
            .version_id(version)
            .authority_level(AuthorityLevel::Statute)
    }

    fn first_half() -> TemporalInterval {
        window(d(2023, 1, 1), Some(d(2023, 7, 5)))
    }

    fn from_june() -> TemporalInterval {
        window(d(2023, 6, 1), Some(d(2024, 1, 1)))
    }

    #[test]
    fn test_deontic_contradiction_detected() {
        let norms = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v2", Modality::Prohibition, from_june()).build().unwrap(),
        ];
        let conflicts = ConflictDetector::default().detect(&norms);
        assert_eq!(conflicts.len(), 1);

        let conflict = &conflicts[0];
        assert_eq!(conflict.conflict_type(), ConflictType::DeonticContradiction);
        assert_eq!(*conflict.overlap(), window(d(2023, 6, 1), Some(d(2023, 7, 5))));
        assert_eq!(conflict.norm_a().version_id(), "v1");
        assert!(conflict.description().contains("required under v1 (source s-v1)"));
        assert!(conflict.description().contains("[2023-06-01, 2023-07-05)"));
    }

    #[test]
    fn test_classification_priority() {
        let a = builder("v1", Modality::Obligation, first_half())
            .conditions("within 10 days")
            .exception("charities")
            .build()
            .unwrap();
        let contradict = builder("v2", Modality::Prohibition, from_june()).build().unwrap();
        let conditions = builder("v2", Modality::Obligation, from_june()).build().unwrap();
        let exceptions = builder("v2", Modality::Obligation, from_june())
            .conditions("Within 10 days")
            .build()
            .unwrap();
        let duplicate = builder("v2", Modality::Obligation, from_june())
            .conditions("within 10 days")
            .exception("Charities")
            .build()
            .unwrap();

        assert_eq!(classify(&a, &contradict), Some(ConflictType::DeonticContradiction));
        assert_eq!(classify(&a, &conditions), Some(ConflictType::ConditionInconsistency));
        assert_eq!(classify(&a, &exceptions), Some(ConflictType::ExceptionGap));
        assert_eq!(classify(&a, &duplicate), Some(ConflictType::TemporalOverlap));
    }

    #[test]
    fn test_obligation_and_permission_do_not_conflict() {
        let obliged = builder("v1", Modality::Obligation, first_half()).build().unwrap();
        let permitted = builder("v2", Modality::Permission, from_june()).build().unwrap();
        let permitted_on_request = builder("v3", Modality::Permission, from_june())
            .conditions("on request")
            .build()
            .unwrap();
        assert_eq!(classify(&obliged, &permitted), None);
        assert_eq!(classify(&permitted, &obliged), None);
        assert_eq!(classify(&obliged, &permitted_on_request), None);

        let norms = vec![obliged, permitted];
        assert!(ConflictDetector::default().detect(&norms).is_empty());
    }

    #[test]
    fn test_repeated_norm_yields_unique_conflicts() {
        let obliged = builder("v1", Modality::Obligation, first_half()).build().unwrap();
        let norms = vec![
            obliged.clone(),
            obliged,
            builder("v2", Modality::Prohibition, from_june()).build().unwrap(),
        ];
        let conflicts = ConflictDetector::default().detect(&norms);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type(), ConflictType::DeonticContradiction);
    }

    #[test]
    fn test_same_version_never_conflicts() {
        let norms = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v1", Modality::Prohibition, from_june()).build().unwrap(),
        ];
        assert!(ConflictDetector::default().detect(&norms).is_empty());
    }

    #[test]
    fn test_touching_windows_never_conflict() {
        let norms = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v2", Modality::Prohibition, window(d(2023, 7, 5), None))
                .build()
                .unwrap(),
        ];
        assert!(ConflictDetector::default().detect(&norms).is_empty());
    }

    #[test]
    fn test_grouping_is_case_insensitive() {
        let norms = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v2", Modality::Prohibition, from_june())
                .subject("  OPERATOR ")
                .action("Disclose")
                .build()
                .unwrap(),
            builder("v2", Modality::Prohibition, from_june())
                .action("retain")
                .build()
                .unwrap(),
        ];
        assert_eq!(ConflictDetector::default().detect(&norms).len(), 1);
    }

    #[test]
    fn test_coverage_ratio() {
        let short = window(d(2023, 1, 1), Some(d(2023, 1, 11)));
        let open = window(d(2023, 1, 1), None);
        let overlap = short.intersection(&open).unwrap();
        assert!((coverage(&overlap, &short, &open) - 1.0).abs() < 1e-9);

        let late = window(d(2023, 1, 6), None);
        let half = short.intersection(&late).unwrap();
        assert!((coverage(&half, &short, &late) - 0.5).abs() < 1e-9);

        let both_open = open.intersection(&late).unwrap();
        assert!((coverage(&both_open, &open, &late) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_severity_scales_with_overlap() {
        let detector = ConflictDetector::default();
        let wide = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v2", Modality::Prohibition, window(d(2023, 1, 1), None))
                .build()
                .unwrap(),
        ];
        let sliver = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v2", Modality::Prohibition, window(d(2023, 7, 4), None))
                .build()
                .unwrap(),
        ];
        let wide = detector.detect(&wide);
        let sliver = detector.detect(&sliver);
        assert!((wide[0].severity() - 1.0).abs() < 1e-9);
        assert!(sliver[0].severity() < 0.81);
        assert!(sliver[0].severity() >= 0.80);
    }

    #[test]
    fn test_min_severity_threshold_drops_conflicts() {
        let config = SeverityConfig {
            min_severity: 0.95,
            ..SeverityConfig::default()
        };
        let norms = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v2", Modality::Prohibition, from_june()).build().unwrap(),
        ];
        assert!(ConflictDetector::new(config).detect(&norms).is_empty());
    }

    #[test]
    fn test_filter_and_rank() {
        let norms = vec![
            builder("v1", Modality::Obligation, first_half()).build().unwrap(),
            builder("v2", Modality::Prohibition, from_june()).build().unwrap(),
            builder("v3", Modality::Obligation, from_june())
                .conditions("on request")
                .build()
                .unwrap(),
        ];
        let mut conflicts = ConflictDetector::default().detect(&norms);
        assert_eq!(conflicts.len(), 3);

        let only_deontic = ConflictFilter::new().with_type(ConflictType::DeonticContradiction);
        assert_eq!(filter_conflicts(&conflicts, &only_deontic).len(), 2);

        let severe = ConflictFilter::new().with_min_severity(0.8);
        assert!(filter_conflicts(&conflicts, &severe)
            .iter()
            .all(|c| c.severity() >= 0.8));

        rank_conflicts(&mut conflicts);
        assert!(conflicts
            .windows(2)
            .all(|w| w[0].severity() >= w[1].severity()));
    }
}
