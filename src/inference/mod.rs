//! Inference layer: canon-based conflict resolution.
//!
//! Resolution is deterministic. Canons are evaluated in a fixed priority
//! order and the first one that applies picks the prevailing norm.

mod canons;
mod resolver;

pub use canons::{CanonRule, LexPosterior, LexSpecialis, LexSuperior, AUTHORITY_ORDERING};
pub use resolver::{CanonResolver, ResolutionFailure, ResolutionOutcome};
