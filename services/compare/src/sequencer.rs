//! Ordered batch comparison.
//!
//! One reference template is compared against a list of candidates, one
//! comparator call at a time and strictly in list order. Every candidate gets
//! exactly one [`CandidateScore`] at its own index, so a failed comparison
//! never shifts the scores that follow it.

use crate::comparator::FaceComparator;
use crate::template::Template;
use serde::{Serialize, Serializer};
use tracing::{debug, instrument, warn};

/// Outcome of comparing the reference against a single candidate
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateScore {
    /// Normalized similarity in [0, 1]; 0 means no match was found
    Score(f32),
    /// The comparator call failed for this candidate
    Failed { reason: String },
}

impl CandidateScore {
    /// Normalize a comparator result into a score
    pub fn from_similarity(similarity: Option<f32>) -> Self {
        match similarity {
            Some(percent) => Self::Score(percent / 100.0),
            None => Self::Score(0.0),
        }
    }

    pub fn score(&self) -> Option<f32> {
        match self {
            Self::Score(value) => Some(*value),
            Self::Failed { .. } => None,
        }
    }
}

/// Scores serialize as bare numbers, failures as `null`
impl Serialize for CandidateScore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Score(value) => serializer.serialize_f32(*value),
            Self::Failed { .. } => serializer.serialize_none(),
        }
    }
}

/// Compare `reference` against each candidate in order.
///
/// The next comparison is issued only after the previous one completes.
/// Comparator errors are logged and recorded in place; the batch continues.
#[instrument(skip_all, fields(reference = %reference.name(), candidates = candidates.len()))]
pub async fn compare_in_order(
    comparator: &dyn FaceComparator,
    reference: &Template,
    candidates: &[Template],
) -> Vec<CandidateScore> {
    let mut scores = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        let score = match comparator.compare(reference, candidate).await {
            Ok(similarity) => CandidateScore::from_similarity(similarity),
            Err(e) => {
                warn!(
                    index,
                    candidate = %candidate.name(),
                    error = %e,
                    "Comparison failed, continuing batch"
                );
                CandidateScore::Failed {
                    reason: e.to_string(),
                }
            }
        };

        debug!(index, candidate = %candidate.name(), score = ?score, "Candidate compared");
        scores.push(score);
    }

    scores
}
