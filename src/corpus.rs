//! Corpus ingestion.
//!
//! A [`Corpus`] is the validated set of norms for one audit run together
//! with the versions of the text they were drawn from. It is the single
//! boundary where loosely shaped input becomes typed [`Norm`] values: every
//! record is checked, and one bad record fails the whole batch.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SpecificityConfig;
use crate::error::{AuditError, ValidationError};
use crate::norm::{AuthorityLevel, Modality, Norm, NormBuilder, NormId};
use crate::time::TemporalInterval;

/// A norm as delivered by an extraction stage.
///
/// Enumerations arrive as strings and are parsed here so an unrecognised
/// value surfaces as a `ValidationError` naming it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormRecord {
    /// `obligation`, `permission`, `prohibition` or `O`/`P`/`F`.
    pub modality: String,
    /// Who is bound.
    pub subject: String,
    /// What is required, permitted or prohibited.
    pub action: String,
    /// Object of the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Conditions under which the norm applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    /// Explicit carve-outs.
    #[serde(default)]
    pub exceptions: Vec<String>,
    /// First day in force.
    pub valid_from: NaiveDate,
    /// First day no longer in force; `null` for open-ended.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    /// Provision the norm was extracted from.
    pub source_id: String,
    /// Must be one of the document's versions.
    pub version_id: String,
    /// `constitution`, `statute`, `regulation` or `guidance`.
    pub authority_level: String,
    /// Date of enactment, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enactment_date: Option<NaiveDate>,
    /// Pinned specificity; derived when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specificity_score: Option<f64>,
}

impl NormRecord {
    /// Parses the record's enumerations and interval into a builder.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an unknown modality or authority level,
    /// or an inverted validity interval.
    pub fn into_builder(self) -> Result<NormBuilder, ValidationError> {
        let modality: Modality = self.modality.parse()?;
        let authority_level: AuthorityLevel = self.authority_level.parse()?;
        let validity = TemporalInterval::new(self.valid_from, self.valid_until)?;

        let mut builder = Norm::builder()
            .modality(modality)
            .subject(self.subject)
            .action(self.action)
            .exceptions(self.exceptions)
            .validity(validity)
            .source_id(self.source_id)
            .version_id(self.version_id)
            .authority_level(authority_level);
        if let Some(object) = self.object {
            builder = builder.object(object);
        }
        if let Some(conditions) = self.conditions {
            builder = builder.conditions(conditions);
        }
        if let Some(date) = self.enactment_date {
            builder = builder.enactment_date(date);
        }
        if let Some(score) = self.specificity_score {
            builder = builder.specificity_score(score);
        }
        Ok(builder)
    }
}

/// Serialized shape of a corpus: declared versions plus raw records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusDocument {
    /// Declared version ids, unique.
    pub versions: Vec<String>,
    /// Norm records in input order.
    #[serde(default)]
    pub norms: Vec<NormRecord>,
}

/// Validated norms plus the versions they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    versions: Vec<String>,
    norms: Vec<Norm>,
    span: Option<TemporalInterval>,
}

impl Corpus {
    /// Starts an empty corpus builder.
    #[must_use]
    pub fn builder() -> CorpusBuilder {
        CorpusBuilder::default()
    }

    /// Validates a parsed document.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` in the batch.
    pub fn from_document(
        document: CorpusDocument,
        weights: &SpecificityConfig,
    ) -> Result<Self, ValidationError> {
        document
            .norms
            .into_iter()
            .fold(Self::builder().versions(document.versions), CorpusBuilder::record)
            .build_with(weights)
    }

    /// Parses and validates a JSON corpus document.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Serialization` for malformed JSON and
    /// `AuditError::Validation` for structurally invalid records.
    pub fn from_json(input: &str, weights: &SpecificityConfig) -> Result<Self, AuditError> {
        let document: CorpusDocument = serde_json::from_str(input)?;
        Ok(Self::from_document(document, weights)?)
    }

    /// Declared versions, in declaration order.
    #[must_use]
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// Norms, in input order.
    #[must_use]
    pub fn norms(&self) -> &[Norm] {
        &self.norms
    }

    /// Smallest interval covering every norm's validity.
    #[must_use]
    pub const fn span(&self) -> Option<&TemporalInterval> {
        self.span.as_ref()
    }

    /// Number of norms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.norms.len()
    }

    /// True when the corpus holds no norms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    /// Looks up a norm by id.
    #[must_use]
    pub fn get(&self, id: NormId) -> Option<&Norm> {
        self.norms.iter().find(|n| n.id() == id)
    }
}

/// Collects versions and norm inputs, then validates them together.
#[derive(Debug, Clone, Default)]
pub struct CorpusBuilder {
    versions: Vec<String>,
    entries: Vec<Result<NormBuilder, ValidationError>>,
}

impl CorpusBuilder {
    /// Declares one version.
    #[must_use]
    pub fn version(mut self, version_id: impl Into<String>) -> Self {
        self.versions.push(version_id.into());
        self
    }

    /// Declares several versions in order.
    #[must_use]
    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versions.extend(versions.into_iter().map(Into::into));
        self
    }

    /// Adds a norm builder.
    #[must_use]
    pub fn norm(mut self, builder: NormBuilder) -> Self {
        self.entries.push(Ok(builder));
        self
    }

    /// Adds a raw record. Parse errors are reported by `build`.
    #[must_use]
    pub fn record(mut self, record: NormRecord) -> Self {
        self.entries.push(record.into_builder());
        self
    }

    /// Validates with the default specificity weights.
    ///
    /// # Errors
    ///
    /// See [`CorpusBuilder::build_with`].
    pub fn build(self) -> Result<Corpus, ValidationError> {
        self.build_with(&SpecificityConfig::default())
    }

    /// Validates every entry and derives specificity scores.
    ///
    /// # Errors
    ///
    /// Returns `NoVersions` or `DuplicateVersion` for a bad version list,
    /// and otherwise the first failing entry wrapped in `InvalidRecord`.
    /// A record identical to an earlier one fails with `DuplicateNorm`.
    pub fn build_with(self, weights: &SpecificityConfig) -> Result<Corpus, ValidationError> {
        let versions: Vec<String> = self
            .versions
            .into_iter()
            .map(|v| v.trim().to_string())
            .collect();
        if versions.is_empty() {
            return Err(ValidationError::NoVersions);
        }
        let mut known = BTreeSet::new();
        for version in &versions {
            if version.is_empty() {
                return Err(ValidationError::MissingField {
                    field: "versions".to_string(),
                });
            }
            if !known.insert(version.as_str()) {
                return Err(ValidationError::DuplicateVersion {
                    version_id: version.clone(),
                });
            }
        }

        let mut builders = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.into_iter().enumerate() {
            let builder = entry.map_err(|e| e.at_record(index))?;
            if let Some(version_id) = builder.declared_version() {
                if !known.contains(version_id) {
                    return Err(ValidationError::UnknownVersion {
                        version_id: version_id.to_string(),
                    }
                    .at_record(index));
                }
            }
            builders.push(builder);
        }

        let span = TemporalInterval::hull(builders.iter().filter_map(NormBuilder::declared_validity));

        let norms = builders
            .into_iter()
            .enumerate()
            .map(|(index, builder)| {
                builder
                    .build_with(weights, span.as_ref())
                    .map_err(|e| e.at_record(index))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = BTreeSet::new();
        for (index, norm) in norms.iter().enumerate() {
            if !seen.insert(norm.id()) {
                return Err(ValidationError::DuplicateNorm { norm_id: norm.id() }.at_record(index));
            }
        }

        info!(
            versions = versions.len(),
            norms = norms.len(),
            "corpus validated"
        );
        Ok(Corpus {
            versions,
            norms,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(version: &str) -> NormRecord {
        NormRecord {
            modality: "obligation".to_string(),
            subject: "operator".to_string(),
            action: "disclose".to_string(),
            object: None,
            conditions: None,
            exceptions: Vec::new(),
            valid_from: d(2023, 1, 1),
            valid_until: Some(d(2023, 7, 5)),
            source_id: format!("s-{version}"),
            version_id: version.to_string(),
            authority_level: "statute".to_string(),
            enactment_date: None,
            specificity_score: None,
        }
    }

    #[test]
    fn test_builds_valid_corpus() {
        let corpus = Corpus::builder()
            .versions(["v1", "v2"])
            .record(record("v1"))
            .record(record("v2"))
            .build()
            .unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.versions(), ["v1".to_string(), "v2".to_string()]);
        let id = corpus.norms()[1].id();
        assert_eq!(corpus.get(id).map(Norm::version_id), Some("v2"));
    }

    #[test]
    fn test_unknown_version_fails_batch() {
        let err = Corpus::builder()
            .version("v1")
            .record(record("v1"))
            .record(record("v9"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownVersion {
                version_id: "v9".to_string()
            }
            .at_record(1)
        );
    }

    #[test]
    fn test_version_list_checks() {
        assert_eq!(Corpus::builder().build().unwrap_err(), ValidationError::NoVersions);
        let err = Corpus::builder().versions(["v1", " v1 "]).build().unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateVersion { .. }));
    }

    #[test]
    fn test_unknown_authority_reported_with_index() {
        let mut bad = record("v1");
        bad.authority_level = "internal_policy".to_string();
        let err = Corpus::builder()
            .version("v1")
            .record(record("v1"))
            .record(bad)
            .build()
            .unwrap_err();
        match err {
            ValidationError::InvalidRecord { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, ValidationError::UnknownAuthorityLevel { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_repeated_record_rejected() {
        let err = Corpus::builder()
            .versions(["v1", "v2"])
            .record(record("v1"))
            .record(record("v2"))
            .record(record("v1"))
            .build()
            .unwrap_err();
        match err {
            ValidationError::InvalidRecord { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, ValidationError::DuplicateNorm { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_records_differing_only_in_pinned_specificity_are_distinct() {
        let mut low = record("v1");
        low.specificity_score = Some(0.4);
        let mut high = record("v1");
        high.specificity_score = Some(0.9);
        let corpus = Corpus::builder()
            .version("v1")
            .record(low)
            .record(high)
            .build()
            .unwrap();
        assert_ne!(corpus.norms()[0].id(), corpus.norms()[1].id());
    }

    #[test]
    fn test_inverted_interval_rejected() {
        let mut bad = record("v1");
        bad.valid_until = Some(d(2022, 1, 1));
        let err = Corpus::builder().version("v1").record(bad).build().unwrap_err();
        assert!(err.to_string().contains("Inverted interval"));
    }

    #[test]
    fn test_specificity_uses_corpus_span() {
        let mut narrow = record("v1");
        narrow.conditions = Some("within 10 days".to_string());
        let mut wide = record("v2");
        wide.valid_until = None;

        let corpus = Corpus::builder()
            .versions(["v1", "v2"])
            .record(narrow)
            .record(wide)
            .build()
            .unwrap();
        // base + conditions + narrower-than-span window
        assert!((corpus.norms()[0].specificity_score() - 0.8).abs() < 1e-9);
        assert!((corpus.norms()[1].specificity_score() - 0.5).abs() < 1e-9);
        assert_eq!(corpus.span(), Some(&TemporalInterval::unbounded(d(2023, 1, 1))));
    }

    #[test]
    fn test_pinned_specificity_kept() {
        let mut pinned = record("v1");
        pinned.specificity_score = Some(0.35);
        let corpus = Corpus::builder().version("v1").record(pinned).build().unwrap();
        assert!((corpus.norms()[0].specificity_score() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_from_json() {
        let input = r#"{
            "versions": ["v1"],
            "norms": [{
                "modality": "F",
                "subject": "operator",
                "action": "disclose",
                "valid_from": "2023-01-01",
                "valid_until": null,
                "source_id": "s1",
                "version_id": "v1",
                "authority_level": "regulation"
            }]
        }"#;
        let corpus = Corpus::from_json(input, &SpecificityConfig::default()).unwrap();
        assert_eq!(corpus.norms()[0].modality(), Modality::Prohibition);
        assert!(corpus.norms()[0].validity().is_unbounded());

        let err = Corpus::from_json("{\"versions\": [], \"bogus\": 1}", &SpecificityConfig::default())
            .unwrap_err();
        assert!(matches!(err, AuditError::Serialization { .. }));
    }
}
