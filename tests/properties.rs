use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use lexaudit::{AuthorityLevel, ConflictDetector, Modality, Norm, TemporalInterval};
use proptest::prelude::*;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Intervals within a few years of 2020, bounded or not, degenerate allowed.
fn arb_interval() -> impl Strategy<Value = TemporalInterval> {
    (0i64..1500, prop::option::of(0i64..800)).prop_map(|(offset, length)| {
        let start = epoch() + Duration::days(offset);
        TemporalInterval::new(start, length.map(|l| start + Duration::days(l))).unwrap()
    })
}

fn arb_non_degenerate() -> impl Strategy<Value = TemporalInterval> {
    arb_interval().prop_filter("degenerate", |i| !i.is_degenerate())
}

fn arb_modality() -> impl Strategy<Value = Modality> {
    prop_oneof![
        Just(Modality::Obligation),
        Just(Modality::Permission),
        Just(Modality::Prohibition),
    ]
}

fn norm(version: &str, modality: Modality, validity: TemporalInterval) -> Norm {
    Norm::builder()
        .modality(modality)
        .subject("operator")
        .action("disclose")
        .validity(validity)
        .source_id("s")
        .version_id(version)
        .authority_level(AuthorityLevel::Statute)
        .build()
        .unwrap()
}

/// True when every day of `inner` lies in `outer`.
fn within(inner: &TemporalInterval, outer: &TemporalInterval) -> bool {
    let starts_inside = inner.start() >= outer.start();
    let ends_inside = match (inner.end(), outer.end()) {
        (_, None) => true,
        (Some(i), Some(o)) => i <= o,
        (None, Some(_)) => false,
    };
    starts_inside && ends_inside
}

proptest! {
    #[test]
    fn overlap_is_symmetric(a in arb_interval(), b in arb_interval()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        prop_assert_eq!(a.intersection(&b), b.intersection(&a));
    }

    #[test]
    fn intersection_is_subset_of_both(a in arb_interval(), b in arb_interval()) {
        if let Some(shared) = a.intersection(&b) {
            prop_assert!(within(&shared, &a));
            prop_assert!(within(&shared, &b));
            prop_assert!(!shared.is_degenerate());
        }
    }

    #[test]
    fn degenerate_never_overlaps(offset in 0i64..1500, other in arb_interval()) {
        let day = epoch() + Duration::days(offset);
        let empty = TemporalInterval::bounded(day, day).unwrap();
        prop_assert!(!empty.overlaps(&empty));
        prop_assert!(!empty.overlaps(&other));
        prop_assert!(!other.overlaps(&empty));
        prop_assert!(!empty.contains_date(day));
    }

    #[test]
    fn contains_date_agrees_with_half_open_bounds(i in arb_interval(), offset in 0i64..2500) {
        let day = epoch() + Duration::days(offset);
        let expected = day >= i.start() && i.end().map_or(true, |end| day < end);
        prop_assert_eq!(i.contains_date(day), expected);
    }

    #[test]
    fn split_parts_rejoin(i in arb_non_degenerate(), offset in 0i64..2500) {
        let day = epoch() + Duration::days(offset);
        match i.split_at(day) {
            (Some(before), Some(after)) => {
                prop_assert_eq!(before.union(&after), Some(i));
                prop_assert!(!before.overlaps(&after));
            }
            (Some(whole), None) | (None, Some(whole)) => prop_assert_eq!(whole, i),
            (None, None) => prop_assert!(false, "split lost the interval"),
        }
    }

    #[test]
    fn disjoint_windows_never_conflict(
        a in arb_non_degenerate(),
        gap in 0i64..100,
        length in prop::option::of(1i64..400),
        ma in arb_modality(),
        mb in arb_modality(),
    ) {
        // Start the second window at or after the first one ends.
        let Some(end) = a.end() else { return Ok(()); };
        let start = end + Duration::days(gap);
        let b = TemporalInterval::new(start, length.map(|l| start + Duration::days(l))).unwrap();

        let norms = [norm("v1", ma, a), norm("v2", mb, b)];
        prop_assert!(ConflictDetector::default().detect(&norms).is_empty());
    }

    #[test]
    fn same_version_never_conflicts(
        a in arb_non_degenerate(),
        b in arb_non_degenerate(),
        ma in arb_modality(),
        mb in arb_modality(),
    ) {
        let norms = [norm("v1", ma, a), norm("v1", mb, b)];
        prop_assert!(ConflictDetector::default().detect(&norms).is_empty());
    }

    #[test]
    fn detected_conflict_ids_are_unique(
        picks in prop::collection::vec((0usize..3, arb_modality(), arb_non_degenerate()), 1..8),
        repeats in prop::collection::vec(0usize..8, 0..4),
    ) {
        let mut norms: Vec<Norm> = picks
            .into_iter()
            .map(|(version, modality, validity)| norm(&format!("v{version}"), modality, validity))
            .collect();
        for index in repeats {
            let copy = norms[index % norms.len()].clone();
            norms.push(copy);
        }

        let conflicts = ConflictDetector::default().detect(&norms);
        let ids: BTreeSet<_> = conflicts.iter().map(|c| c.id()).collect();
        prop_assert_eq!(ids.len(), conflicts.len());
    }

    #[test]
    fn detected_severity_stays_in_unit_range(
        a in arb_non_degenerate(),
        b in arb_non_degenerate(),
        ma in arb_modality(),
        mb in arb_modality(),
    ) {
        let norms = [norm("v1", ma, a), norm("v2", mb, b)];
        for conflict in ConflictDetector::default().detect(&norms) {
            prop_assert!((0.0..=1.0).contains(&conflict.severity()));
            prop_assert!(!conflict.overlap().is_degenerate());
        }
    }
}
