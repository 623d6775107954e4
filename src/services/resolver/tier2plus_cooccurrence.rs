//! Tier 2+: probabilistic co-occurrence matcher.
//!
//! When every deterministic lookup in tier 2 misses, this tier scores a
//! candidate artist/label match against DJ-set context: is this person
//! known to DJ in this scene, was the unidentified track played immediately
//! before/after an identified one by this artist, do they share a label,
//! does the DJ own the label. Fellegi-Sunter record linkage with EM
//! parameter estimation, same as probabilistic dedup in entity-resolution
//! literature this system borrows from; no teacher module does anything
//! like this, so the estimator below is written fresh rather than adapted.
//!
//! Accept at confidence >= 0.85 (default acceptance), tag 0.70-0.85 as
//! "medium confidence" for human review, reject below 0.70.

pub const ACCEPT_THRESHOLD: f64 = 0.85;
pub const REVIEW_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchConfidence {
    Accept,
    Medium,
    Reject,
}

pub fn classify(probability: f64) -> MatchConfidence {
    if probability >= ACCEPT_THRESHOLD {
        MatchConfidence::Accept
    } else if probability >= REVIEW_THRESHOLD {
        MatchConfidence::Medium
    } else {
        MatchConfidence::Reject
    }
}

/// A DJ-set context feature vector for one candidate (unidentified citation,
/// known artist) pair. Each field is a binary agreement indicator.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVector {
    pub is_this_dj: bool,
    pub adjacent_in_set: bool,
    pub shares_label: bool,
    pub dj_owns_label: bool,
}

impl FeatureVector {
    fn as_array(&self) -> [bool; 4] {
        [self.is_this_dj, self.adjacent_in_set, self.shares_label, self.dj_owns_label]
    }
}

pub const FIELD_COUNT: usize = 4;

/// Per-field match/non-match agreement probabilities, as in Fellegi-Sunter:
/// `m` is P(field agrees | true match), `u` is P(field agrees | true
/// non-match). `m > u` for a field that's informative.
#[derive(Debug, Clone)]
pub struct FellegiSunterModel {
    pub m: [f64; FIELD_COUNT],
    pub u: [f64; FIELD_COUNT],
    /// Prior probability a candidate pair is a true match.
    pub prior: f64,
}

impl FellegiSunterModel {
    fn initial() -> Self {
        Self { m: [0.9; FIELD_COUNT], u: [0.1; FIELD_COUNT], prior: 0.5 }
    }

    fn field_likelihood(&self, field: usize, agrees: bool, is_match_hypothesis: bool) -> f64 {
        let p = if is_match_hypothesis { self.m[field] } else { self.u[field] };
        if agrees {
            p
        } else {
            1.0 - p
        }
    }

    fn vector_likelihood(&self, vector: &FeatureVector, is_match_hypothesis: bool) -> f64 {
        vector
            .as_array()
            .iter()
            .enumerate()
            .map(|(i, &agrees)| self.field_likelihood(i, agrees, is_match_hypothesis))
            .product()
    }

    /// Posterior probability that `vector` describes a true match, under
    /// this model's current parameters.
    pub fn posterior(&self, vector: &FeatureVector) -> f64 {
        let match_likelihood = self.prior * self.vector_likelihood(vector, true);
        let non_match_likelihood = (1.0 - self.prior) * self.vector_likelihood(vector, false);
        let total = match_likelihood + non_match_likelihood;
        if total <= 0.0 {
            0.0
        } else {
            match_likelihood / total
        }
    }
}

/// Runs EM to estimate `m`/`u`/`prior` from an unlabeled sample of feature
/// vectors observed across past resolutions. Converges quickly for binary
/// fields; a fixed iteration count is simpler than a convergence-delta check
/// and matches this tier's batch-offline usage (it is not run per-request).
pub fn estimate_parameters(vectors: &[FeatureVector], iterations: usize) -> FellegiSunterModel {
    if vectors.is_empty() {
        return FellegiSunterModel::initial();
    }

    let mut model = FellegiSunterModel::initial();

    for _ in 0..iterations {
        let posteriors: Vec<f64> = vectors.iter().map(|v| model.posterior(v)).collect();

        let match_weight: f64 = posteriors.iter().sum();
        let non_match_weight: f64 = posteriors.len() as f64 - match_weight;

        if match_weight > 0.0 {
            for field in 0..FIELD_COUNT {
                let agree_weight: f64 = vectors
                    .iter()
                    .zip(&posteriors)
                    .filter(|(v, _)| v.as_array()[field])
                    .map(|(_, p)| p)
                    .sum();
                model.m[field] = (agree_weight / match_weight).clamp(0.01, 0.99);
            }
        }

        if non_match_weight > 0.0 {
            for field in 0..FIELD_COUNT {
                let agree_weight: f64 = vectors
                    .iter()
                    .zip(&posteriors)
                    .filter(|(v, _)| v.as_array()[field])
                    .map(|(_, p)| 1.0 - p)
                    .sum();
                model.u[field] = (agree_weight / non_match_weight).clamp(0.01, 0.99);
            }
        }

        model.prior = (match_weight / vectors.len() as f64).clamp(0.01, 0.99);
    }

    model
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_match() -> FeatureVector {
        FeatureVector { is_this_dj: true, adjacent_in_set: true, shares_label: true, dj_owns_label: true }
    }

    fn strong_non_match() -> FeatureVector {
        FeatureVector { is_this_dj: false, adjacent_in_set: false, shares_label: false, dj_owns_label: false }
    }

    #[test]
    fn classify_respects_thresholds() {
        assert_eq!(classify(0.9), MatchConfidence::Accept);
        assert_eq!(classify(0.75), MatchConfidence::Medium);
        assert_eq!(classify(0.5), MatchConfidence::Reject);
        assert_eq!(classify(0.85), MatchConfidence::Accept);
        assert_eq!(classify(0.70), MatchConfidence::Medium);
    }

    #[test]
    fn initial_model_scores_full_agreement_highly() {
        let model = FellegiSunterModel::initial();
        let score = model.posterior(&strong_match());
        assert!(score > 0.9, "expected strong match to score high, got {score}");
    }

    #[test]
    fn initial_model_scores_full_disagreement_lowly() {
        let model = FellegiSunterModel::initial();
        let score = model.posterior(&strong_non_match());
        assert!(score < 0.1, "expected strong non-match to score low, got {score}");
    }

    #[test]
    fn em_converges_toward_separating_the_two_populations() {
        let mut vectors = Vec::new();
        for _ in 0..50 {
            vectors.push(strong_match());
        }
        for _ in 0..50 {
            vectors.push(strong_non_match());
        }

        let model = estimate_parameters(&vectors, 10);
        assert!(model.posterior(&strong_match()) > 0.9);
        assert!(model.posterior(&strong_non_match()) < 0.1);
    }

    #[test]
    fn empty_sample_yields_initial_model() {
        let model = estimate_parameters(&[], 10);
        assert_eq!(model.prior, 0.5);
    }

    #[test]
    fn partial_agreement_lands_in_medium_band() {
        // Only the DJ-identity field is informative here (m != u); the rest
        // carry m == u so they cancel out of the posterior entirely.
        let model = FellegiSunterModel {
            m: [0.8, 0.5, 0.5, 0.5],
            u: [0.2, 0.5, 0.5, 0.5],
            prior: 0.5,
        };
        let mixed = FeatureVector {
            is_this_dj: true,
            adjacent_in_set: false,
            shares_label: false,
            dj_owns_label: false,
        };
        let score = model.posterior(&mixed);
        assert_eq!(classify(score), MatchConfidence::Medium);
    }
}
