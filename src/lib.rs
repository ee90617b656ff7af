//! # LexAudit - Intertemporal Norm Conflict Auditing
//!
//! LexAudit finds places where two versions of a regulatory text impose
//! contradictory or inconsistent requirements during a shared period of
//! applicability, and resolves each contradiction with the classic legal
//! canons. Every verdict is deterministic and reproducible.
//!
//! ## Core Concepts
//!
//! - **TemporalInterval**: A half-open `[start, end)` span of days, possibly unbounded
//! - **Norm**: One extracted rule with a modality, scope, validity and source version
//! - **Conflict**: Two cross-version norms that clash during an overlapping window
//! - **Resolution**: The prevailing norm picked by Lex Superior, Specialis or Posterior
//!
//! ## Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use lexaudit::{AuditConfig, Auditor, AuthorityLevel, Canon, Corpus, Modality, Norm, TemporalInterval};
//!
//! let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
//!
//! let corpus = Corpus::builder()
//!     .versions(["2023-01", "2023-06"])
//!     .norm(
//!         Norm::builder()
//!             .modality(Modality::Obligation)
//!             .subject("operator")
//!             .action("disclose")
//!             .validity(TemporalInterval::bounded(day(2023, 1, 1), day(2023, 7, 5))?)
//!             .source_id("statute-12")
//!             .version_id("2023-01")
//!             .authority_level(AuthorityLevel::Statute),
//!     )
//!     .norm(
//!         Norm::builder()
//!             .modality(Modality::Prohibition)
//!             .subject("operator")
//!             .action("disclose")
//!             .validity(TemporalInterval::bounded(day(2023, 6, 1), day(2024, 1, 1))?)
//!             .source_id("reg-7")
//!             .version_id("2023-06")
//!             .authority_level(AuthorityLevel::Regulation),
//!     )
//!     .build()?;
//!
//! let report = Auditor::new(AuditConfig::default())?.run(&corpus)?;
//! let resolution = report.conflicts[0].resolution().unwrap();
//! assert_eq!(resolution.canon(), Canon::LexSuperior);
//! # Ok::<(), lexaudit::AuditError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod config;
pub mod conflict;
pub mod error;
pub mod norm;
pub mod time;

// Analysis
pub mod audit;
pub mod corpus;
pub mod detector;
pub mod inference;
pub mod summary;

// Re-export primary types at crate root for convenience
pub use audit::{AuditReport, Auditor};
pub use config::{AuditConfig, CanonConfig, SeverityBand, SeverityConfig, SpecificityConfig};
pub use conflict::{Canon, Conflict, ConflictId, ConflictType, Resolution};
pub use corpus::{Corpus, CorpusBuilder, CorpusDocument, NormRecord};
pub use detector::{filter_conflicts, rank_conflicts, ConflictDetector, ConflictFilter};
pub use error::{AuditError, AuditResult, ConfigurationError, ValidationError};
pub use inference::{CanonResolver, CanonRule, ResolutionFailure, ResolutionOutcome};
pub use norm::{AuthorityLevel, Modality, Norm, NormBuilder, NormId};
pub use summary::{explain_resolution, rank_resolutions, ConflictSummary, ResolutionSummary};
pub use time::TemporalInterval;
