//! Norm types: the atomic unit of an audited regulatory text.
//!
//! A Norm is a single extracted rule (obligation, permission or
//! prohibition) with a scope, a period of validity and the version of the
//! text it was drawn from. Norms are validated once, when built, and are
//! never mutated afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SpecificityConfig;
use crate::error::ValidationError;
use crate::time::TemporalInterval;

/// Namespace for content-derived norm identifiers.
const NORM_NAMESPACE: Uuid = Uuid::from_u128(0x5c1d_7a0e_93b4_4f62_8e2a_d10f_6b3c_9a41);

/// Separators used when hashing norm content.
const FIELD_SEP: char = '\u{1e}';
const ITEM_SEP: &str = "\u{1f}";

/// Content-derived identifier of a norm.
///
/// Two norms with identical content always receive the same id, so audit
/// output never depends on generation order or randomness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormId(Uuid);

impl NormId {
    fn from_content(content: &str) -> Self {
        Self(Uuid::new_v5(&NORM_NAMESPACE, content.as_bytes()))
    }

    /// Returns the raw bytes of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for NormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deontic modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Must do.
    Obligation,

    /// May do.
    Permission,

    /// Must not do.
    Prohibition,
}

impl Modality {
    /// True when the two modalities cannot both be honoured.
    ///
    /// Obligation/Prohibition and Permission/Prohibition, in either order.
    #[must_use]
    pub const fn contradicts(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Obligation | Self::Permission, Self::Prohibition)
                | (Self::Prohibition, Self::Obligation | Self::Permission)
        )
    }

    /// Past-participle used in conflict descriptions.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Obligation => "required",
            Self::Permission => "permitted",
            Self::Prohibition => "prohibited",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Obligation => write!(f, "obligation"),
            Self::Permission => write!(f, "permission"),
            Self::Prohibition => write!(f, "prohibition"),
        }
    }
}

impl FromStr for Modality {
    type Err = ValidationError;

    /// Accepts canonical names and the deontic codes `O`, `P`, `F`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "obligation" | "o" => Ok(Self::Obligation),
            "permission" | "p" => Ok(Self::Permission),
            "prohibition" | "f" => Ok(Self::Prohibition),
            _ => Err(ValidationError::UnknownModality {
                value: s.to_string(),
            }),
        }
    }
}

/// Rank of the issuing instrument.
///
/// Declared lowest first so the derived ordering reads
/// `Constitution > Statute > Regulation > Guidance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    /// Non-binding guidance.
    Guidance,
    Regulation,
    Statute,
    /// Highest rank.
    Constitution,
}

impl AuthorityLevel {
    /// Numeric rank, higher is more authoritative.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Guidance => 1,
            Self::Regulation => 2,
            Self::Statute => 3,
            Self::Constitution => 4,
        }
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guidance => write!(f, "guidance"),
            Self::Regulation => write!(f, "regulation"),
            Self::Statute => write!(f, "statute"),
            Self::Constitution => write!(f, "constitution"),
        }
    }
}

impl FromStr for AuthorityLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constitution" => Ok(Self::Constitution),
            "statute" => Ok(Self::Statute),
            "regulation" => Ok(Self::Regulation),
            "guidance" => Ok(Self::Guidance),
            _ => Err(ValidationError::UnknownAuthorityLevel {
                value: s.to_string(),
            }),
        }
    }
}

/// A single extracted legal rule.
///
/// Build with [`Norm::builder`] or through a [`crate::Corpus`], which also
/// checks the version against the corpus's declared versions.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use lexaudit::{AuthorityLevel, Modality, Norm, TemporalInterval};
///
/// let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
/// let norm = Norm::builder()
///     .modality(Modality::Obligation)
///     .subject("operator")
///     .action("disclose")
///     .validity(TemporalInterval::unbounded(start))
///     .source_id("s1")
///     .version_id("v1")
///     .authority_level(AuthorityLevel::Statute)
///     .build()
///     .unwrap();
///
/// assert_eq!(norm.modality(), Modality::Obligation);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Norm {
    id: NormId,
    modality: Modality,
    subject: String,
    action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conditions: Option<String>,
    exceptions: BTreeSet<String>,
    validity: TemporalInterval,
    source_id: String,
    version_id: String,
    authority_level: AuthorityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    enactment_date: Option<NaiveDate>,
    specificity_score: f64,
}

impl Norm {
    /// Starts a new [`NormBuilder`].
    #[must_use]
    pub fn builder() -> NormBuilder {
        NormBuilder::new()
    }

    /// Content-derived identifier.
    #[must_use]
    pub const fn id(&self) -> NormId {
        self.id
    }

    /// Obligation, permission or prohibition.
    #[must_use]
    pub const fn modality(&self) -> Modality {
        self.modality
    }

    /// Who is bound, as written in the source.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// What is required, permitted or prohibited.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Object of the action, if named.
    #[must_use]
    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Conditions under which the norm applies, if any.
    #[must_use]
    pub fn conditions(&self) -> Option<&str> {
        self.conditions.as_deref()
    }

    /// Explicit carve-outs, as a sorted set.
    #[must_use]
    pub const fn exceptions(&self) -> &BTreeSet<String> {
        &self.exceptions
    }

    /// Period during which the norm is in force.
    #[must_use]
    pub const fn validity(&self) -> &TemporalInterval {
        &self.validity
    }

    /// Provision the norm was extracted from.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Version of the text the norm belongs to.
    #[must_use]
    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    /// Rank of the issuing instrument.
    #[must_use]
    pub const fn authority_level(&self) -> AuthorityLevel {
        self.authority_level
    }

    /// Date the provision was enacted, when known.
    #[must_use]
    pub const fn enactment_date(&self) -> Option<NaiveDate> {
        self.enactment_date
    }

    /// Narrowness of scope in `[0, 1]`, higher is more specific.
    #[must_use]
    pub const fn specificity_score(&self) -> f64 {
        self.specificity_score
    }

    /// Case-insensitive, trimmed `(subject, action)` key used for grouping.
    #[must_use]
    pub fn group_key(&self) -> (String, String) {
        (
            self.subject.trim().to_lowercase(),
            self.action.trim().to_lowercase(),
        )
    }

    /// True when both norms carry the same conditions (or both none).
    #[must_use]
    pub fn same_conditions(&self, other: &Self) -> bool {
        self.conditions.as_deref().map(normalize_text)
            == other.conditions.as_deref().map(normalize_text)
    }

    /// True when both norms carry the same set of exceptions.
    #[must_use]
    pub fn same_exceptions(&self, other: &Self) -> bool {
        self.normalized_exceptions() == other.normalized_exceptions()
    }

    fn normalized_exceptions(&self) -> BTreeSet<String> {
        self.exceptions.iter().map(|e| normalize_text(e)).collect()
    }
}

/// Lowercases and collapses runs of whitespace.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn trimmed_required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builder for creating Norm instances.
///
/// Ensures all required fields are set and every structural invariant
/// holds before a `Norm` exists.
#[derive(Debug, Clone, Default)]
pub struct NormBuilder {
    modality: Option<Modality>,
    subject: Option<String>,
    action: Option<String>,
    object: Option<String>,
    conditions: Option<String>,
    exceptions: Vec<String>,
    validity: Option<TemporalInterval>,
    source_id: Option<String>,
    version_id: Option<String>,
    authority_level: Option<AuthorityLevel>,
    enactment_date: Option<NaiveDate>,
    specificity_score: Option<f64>,
}

impl NormBuilder {
    /// Creates a new norm builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deontic modality.
    #[must_use]
    pub fn modality(mut self, modality: Modality) -> Self {
        self.modality = Some(modality);
        self
    }

    /// Who is bound by the norm.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// What must, may or must not be done.
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Object of the action.
    #[must_use]
    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Conditions under which the norm applies.
    #[must_use]
    pub fn conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    /// Adds one exception. Duplicates collapse.
    #[must_use]
    pub fn exception(mut self, exception: impl Into<String>) -> Self {
        self.exceptions.push(exception.into());
        self
    }

    /// Adds several exceptions.
    #[must_use]
    pub fn exceptions<I, S>(mut self, exceptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exceptions.extend(exceptions.into_iter().map(Into::into));
        self
    }

    /// Period in force.
    #[must_use]
    pub fn validity(mut self, validity: TemporalInterval) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Provision the norm was extracted from.
    #[must_use]
    pub fn source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Version of the text.
    #[must_use]
    pub fn version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Rank of the issuing instrument.
    #[must_use]
    pub fn authority_level(mut self, authority_level: AuthorityLevel) -> Self {
        self.authority_level = Some(authority_level);
        self
    }

    /// Enactment date, used by Lex Posterior.
    #[must_use]
    pub fn enactment_date(mut self, date: NaiveDate) -> Self {
        self.enactment_date = Some(date);
        self
    }

    /// Pins the specificity score instead of deriving it.
    #[must_use]
    pub fn specificity_score(mut self, score: f64) -> Self {
        self.specificity_score = Some(score);
        self
    }

    pub(crate) fn declared_version(&self) -> Option<&str> {
        self.version_id.as_deref().map(str::trim)
    }

    pub(crate) fn declared_validity(&self) -> Option<&TemporalInterval> {
        self.validity.as_ref()
    }

    /// Builds the Norm, deriving specificity from the default weights.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if a required field is missing, the
    /// validity interval is degenerate, or a pinned specificity score lies
    /// outside `[0, 1]`.
    pub fn build(self) -> Result<Norm, ValidationError> {
        self.build_with(&SpecificityConfig::default(), None)
    }

    /// Builds the Norm, deriving specificity against a corpus-wide span.
    pub(crate) fn build_with(
        self,
        weights: &SpecificityConfig,
        corpus_span: Option<&TemporalInterval>,
    ) -> Result<Norm, ValidationError> {
        let modality = self.modality.ok_or(ValidationError::MissingField {
            field: "modality".to_string(),
        })?;
        let subject = trimmed_required("subject", self.subject)?;
        let action = trimmed_required("action", self.action)?;
        let source_id = trimmed_required("source_id", self.source_id)?;
        let version_id = trimmed_required("version_id", self.version_id)?;
        let authority_level = self.authority_level.ok_or(ValidationError::MissingField {
            field: "authority_level".to_string(),
        })?;
        let validity = self.validity.ok_or(ValidationError::MissingField {
            field: "validity".to_string(),
        })?;
        if validity.is_degenerate() {
            return Err(ValidationError::DegenerateInterval {
                date: validity.start(),
            });
        }

        let object = trimmed_optional(self.object);
        let conditions = trimmed_optional(self.conditions);
        let exceptions: BTreeSet<String> = self
            .exceptions
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();

        let specificity_score = match self.specificity_score {
            Some(score) => {
                if !(0.0..=1.0).contains(&score) {
                    return Err(ValidationError::ScoreOutOfRange {
                        field: "specificity_score".to_string(),
                        value: score,
                    });
                }
                score
            }
            None => weights.score(
                conditions.is_some(),
                !exceptions.is_empty(),
                object.is_some(),
                corpus_span.is_some_and(|span| validity.is_narrower_than(span)),
            ),
        };

        let id = NormId::from_content(&canonical_content(&[
            &modality.to_string(),
            &subject,
            &action,
            object.as_deref().unwrap_or(""),
            conditions.as_deref().unwrap_or(""),
            &exceptions.iter().cloned().collect::<Vec<_>>().join(ITEM_SEP),
            &validity.to_string(),
            &source_id,
            &version_id,
            &authority_level.to_string(),
            &enactment_date_text(self.enactment_date),
            &specificity_score.to_string(),
        ]));

        Ok(Norm {
            id,
            modality,
            subject,
            action,
            object,
            conditions,
            exceptions,
            validity,
            source_id,
            version_id,
            authority_level,
            enactment_date: self.enactment_date,
            specificity_score,
        })
    }
}

fn enactment_date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn canonical_content(fields: &[&str]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEP);
        }
        out.push_str(field);
    }
    out
}

impl<'de> Deserialize<'de> for Norm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            modality: Modality,
            subject: String,
            action: String,
            #[serde(default)]
            object: Option<String>,
            #[serde(default)]
            conditions: Option<String>,
            #[serde(default)]
            exceptions: Vec<String>,
            validity: TemporalInterval,
            source_id: String,
            version_id: String,
            authority_level: AuthorityLevel,
            #[serde(default)]
            enactment_date: Option<NaiveDate>,
            specificity_score: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut builder = NormBuilder::new()
            .modality(raw.modality)
            .subject(raw.subject)
            .action(raw.action)
            .exceptions(raw.exceptions)
            .validity(raw.validity)
            .source_id(raw.source_id)
            .version_id(raw.version_id)
            .authority_level(raw.authority_level)
            .specificity_score(raw.specificity_score);
        if let Some(object) = raw.object {
            builder = builder.object(object);
        }
        if let Some(conditions) = raw.conditions {
            builder = builder.conditions(conditions);
        }
        if let Some(date) = raw.enactment_date {
            builder = builder.enactment_date(date);
        }
        builder.build().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn base_builder() -> NormBuilder {
        Norm::builder()
            .modality(Modality::Obligation)
            .subject("Operator")
            .action(" disclose ")
            .validity(TemporalInterval::bounded(d(2023, 1, 1), d(2023, 7, 5)).unwrap())
            .source_id("s1")
            .version_id("v1")
            .authority_level(AuthorityLevel::Statute)
    }

    #[test]
    fn test_builder_success() {
        let norm = base_builder().build().unwrap();
        assert_eq!(norm.action(), "disclose");
        assert_eq!(norm.group_key(), ("operator".to_string(), "disclose".to_string()));
        assert!((norm.specificity_score() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_builder_missing_field() {
        let err = Norm::builder().modality(Modality::Permission).build().unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn test_builder_blank_subject_rejected() {
        let err = base_builder().subject("   ").build().unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "subject".to_string()
            }
        );
    }

    #[test]
    fn test_builder_rejects_degenerate_validity() {
        let err = base_builder()
            .validity(TemporalInterval::bounded(d(2023, 1, 1), d(2023, 1, 1)).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::DegenerateInterval { .. }));
    }

    #[test]
    fn test_builder_rejects_out_of_range_specificity() {
        let err = base_builder().specificity_score(1.2).build().unwrap_err();
        assert!(matches!(err, ValidationError::ScoreOutOfRange { .. }));
    }

    #[test]
    fn test_exceptions_are_a_set() {
        let a = base_builder()
            .exceptions(["small firms", "charities", "small firms"])
            .build()
            .unwrap();
        let b = base_builder()
            .exceptions(["Charities", "small  firms"])
            .build()
            .unwrap();
        assert_eq!(a.exceptions().len(), 2);
        assert!(a.same_exceptions(&b));
    }

    #[test]
    fn test_same_conditions_normalizes() {
        let a = base_builder().conditions("within 10 days").build().unwrap();
        let b = base_builder().conditions("Within  10 days ").build().unwrap();
        let c = base_builder().build().unwrap();
        assert!(a.same_conditions(&b));
        assert!(!a.same_conditions(&c));
    }

    #[test]
    fn test_blank_conditions_are_absent() {
        let norm = base_builder().conditions("   ").build().unwrap();
        assert!(norm.conditions().is_none());
    }

    #[test]
    fn test_id_is_content_derived() {
        let a = base_builder().build().unwrap();
        let b = base_builder().build().unwrap();
        let c = base_builder().version_id("v2").build().unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_id_covers_specificity() {
        let derived = base_builder().build().unwrap();
        let pinned_same = base_builder().specificity_score(0.5).build().unwrap();
        let pinned_other = base_builder().specificity_score(0.9).build().unwrap();
        assert_eq!(derived.id(), pinned_same.id());
        assert_ne!(derived.id(), pinned_other.id());
    }

    #[test]
    fn test_modality_contradictions() {
        use Modality::{Obligation, Permission, Prohibition};
        assert!(Obligation.contradicts(Prohibition));
        assert!(Prohibition.contradicts(Permission));
        assert!(!Obligation.contradicts(Permission));
        assert!(!Prohibition.contradicts(Prohibition));
    }

    #[test]
    fn test_modality_from_str() {
        assert_eq!("O".parse::<Modality>().unwrap(), Modality::Obligation);
        assert_eq!("prohibition".parse::<Modality>().unwrap(), Modality::Prohibition);
        assert!("shall".parse::<Modality>().is_err());
    }

    #[test]
    fn test_authority_ordering() {
        assert!(AuthorityLevel::Constitution > AuthorityLevel::Statute);
        assert!(AuthorityLevel::Statute > AuthorityLevel::Regulation);
        assert!(AuthorityLevel::Regulation > AuthorityLevel::Guidance);
        assert!("internal_policy".parse::<AuthorityLevel>().is_err());
    }

    #[test]
    fn test_serialization_round_trip() {
        let norm = base_builder()
            .exception("charities")
            .enactment_date(d(2022, 11, 11))
            .build()
            .unwrap();
        let json = serde_json::to_string(&norm).unwrap();
        assert!(json.contains(r#""modality":"obligation""#));
        assert!(json.contains(r#""authority_level":"statute""#));

        let back: Norm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, norm);
    }
}
