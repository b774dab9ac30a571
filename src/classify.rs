//! Name-classifier collaborator seam.
//!
//! Dyadic conversations can carry an optional gender guess for the
//! counterpart's name, used by downstream reporting. The classifier itself
//! is an external collaborator; the crate only defines the seam and stores
//! the guess (with its confidence, retained for audit).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    /// The classifier could not decide.
    Ambiguous,
}

/// A classifier's verdict for one name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderGuess {
    pub gender: Gender,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
}

/// Guesses a gender from a given name.
///
/// Implementations are supplied by the caller; ingestion works without one,
/// leaving the signal unset.
pub trait NameClassifier {
    /// Classifies the first token of a display name. `None` when the
    /// classifier has no opinion.
    fn classify(&self, first_name: &str) -> Option<GenderGuess>;
}
