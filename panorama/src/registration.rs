use crate::{CandidateList, Diagnostic, PanoramaSettings};
use arrsac::Arrsac;
use four_point::{FourPoint, Homography, MIN_CORRESPONDENCES};
use log::*;
use pano_core::{
    sample_consensus::{Consensus, Model},
    FeatureMatch, FeatureSet, KeyPoint, MatchSet,
};
use rand::SeedableRng;
use rand_pcg::Pcg64;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A homography together with the correspondences that agree with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub homography: Homography,
    /// One flag per input correspondence, `true` for inliers.
    pub inliers: Vec<bool>,
}

impl Registration {
    pub fn num_inliers(&self) -> usize {
        self.inliers.iter().filter(|&&inlier| inlier).count()
    }

    pub fn num_correspondences(&self) -> usize {
        self.inliers.len()
    }
}

/// Outlier tolerant homography estimation.
///
/// ARRSAC searches for the homography with the most matches within `inlier_threshold`
/// pixels of reprojection error, the winner is refit to all of its inliers, and the inlier
/// mask is recomputed from the final transform.
#[derive(Debug, Clone, Copy)]
pub struct RobustHomography {
    pub inlier_threshold: f64,
    pub seed: u64,
    pub estimator: FourPoint,
}

impl RobustHomography {
    pub fn new(inlier_threshold: f64) -> Self {
        Self {
            inlier_threshold,
            seed: 0,
            estimator: FourPoint::new(),
        }
    }

    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Estimates the homography taking `object` points onto `scene` points.
    ///
    /// Returns `None` if the sequences differ in length, contain fewer than four points,
    /// or admit no non-degenerate transform.
    pub fn estimate(&self, object: &[KeyPoint], scene: &[KeyPoint]) -> Option<Registration> {
        if object.len() != scene.len() || object.len() < MIN_CORRESPONDENCES {
            return None;
        }
        let matches: Vec<FeatureMatch> = object
            .iter()
            .zip(scene)
            .map(|(&a, &b)| FeatureMatch(a, b))
            .collect();
        self.estimate_matches(&matches)
    }

    pub fn estimate_matches(&self, matches: &[FeatureMatch]) -> Option<Registration> {
        if matches.len() < MIN_CORRESPONDENCES {
            return None;
        }
        let mut arrsac = Arrsac::new(self.inlier_threshold, Pcg64::seed_from_u64(self.seed));
        let homography = match arrsac.model_inliers(&self.estimator, matches.iter().copied()) {
            Some((model, inliers)) => self.refine(matches, model, &inliers),
            None => {
                debug!("consensus found no model, fitting all {} matches", matches.len());
                self.estimator.from_matches(matches.iter().copied())?
            }
        };
        let inliers = matches
            .iter()
            .map(|m| homography.residual(m) <= self.inlier_threshold)
            .collect();
        Some(Registration {
            homography,
            inliers,
        })
    }

    fn count_inliers(&self, matches: &[FeatureMatch], homography: &Homography) -> usize {
        matches
            .iter()
            .filter(|m| homography.residual(m) <= self.inlier_threshold)
            .count()
    }

    fn refine(&self, matches: &[FeatureMatch], model: Homography, inliers: &[usize]) -> Homography {
        let refit = self
            .estimator
            .from_matches(inliers.iter().map(|&ix| matches[ix]));
        match refit {
            Some(refit)
                if self.count_inliers(matches, &refit) >= self.count_inliers(matches, &model) =>
            {
                refit
            }
            _ => model,
        }
    }
}

/// Decides whether a registration is trustworthy.
///
/// A pair is valid when `inliers > alpha + beta * correspondences`, where `correspondences`
/// is the total number of matches the homography was fit to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairValidator {
    pub alpha: f64,
    pub beta: f64,
}

impl PairValidator {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    pub fn is_valid(&self, num_inliers: usize, num_correspondences: usize) -> bool {
        num_inliers as f64 > self.alpha + self.beta * num_correspondences as f64
    }

    pub fn validate(&self, registration: &Registration) -> bool {
        self.is_valid(
            registration.num_inliers(),
            registration.num_correspondences(),
        )
    }
}

impl Default for PairValidator {
    fn default() -> Self {
        let settings = PanoramaSettings::default();
        Self::new(settings.alpha, settings.beta)
    }
}

/// An edge of the assembly graph: `homography` takes image `source` into image `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPair {
    pub source: usize,
    pub target: usize,
    pub homography: Homography,
    pub inliers: usize,
    pub correspondences: usize,
}

/// What became of one candidate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Validated(ValidatedPair),
    Rejected(Diagnostic),
}

/// Estimates and validates the homography of a single candidate pair.
pub fn register_pair(
    match_set: &MatchSet,
    features: &[FeatureSet],
    robust: &RobustHomography,
    validator: &PairValidator,
) -> PairOutcome {
    let (source, target) = (match_set.source, match_set.target);
    if match_set.len() < MIN_CORRESPONDENCES {
        debug!(
            "image {} to {}: only {} correspondences, skipping",
            source,
            target,
            match_set.len()
        );
        return PairOutcome::Rejected(Diagnostic::InsufficientCorrespondences {
            source,
            target,
            count: match_set.len(),
        });
    }
    let (object, scene) = match_set.point_sequences(&features[source], &features[target]);
    let registration = match robust.estimate(&object, &scene) {
        Some(registration) => registration,
        None => {
            info!("image {} to {}: degenerate geometry", source, target);
            return PairOutcome::Rejected(Diagnostic::DegenerateGeometry { source, target });
        }
    };
    let inliers = registration.num_inliers();
    let correspondences = registration.num_correspondences();
    if validator.validate(&registration) {
        info!(
            "image {} to {}: good match with {} inliers of {}",
            source, target, inliers, correspondences
        );
        trace!("homography {} to {}: {}", source, target, registration.homography.0);
        PairOutcome::Validated(ValidatedPair {
            source,
            target,
            homography: registration.homography,
            inliers,
            correspondences,
        })
    } else {
        info!(
            "image {} to {}: rejected with {} inliers of {}",
            source, target, inliers, correspondences
        );
        PairOutcome::Rejected(Diagnostic::ValidationRejection {
            source,
            target,
            inliers,
            correspondences,
        })
    }
}

/// Registers every candidate pair.
///
/// Validated pairs are returned in discovery order: by source image, then by the order of
/// the source's candidate list. Each pair samples with its own seed derived from
/// `settings.consensus_seed`, so the outcome does not depend on scheduling.
pub fn register_candidates(
    candidates: &[CandidateList],
    features: &[FeatureSet],
    settings: &PanoramaSettings,
) -> (Vec<ValidatedPair>, Vec<Diagnostic>) {
    let validator = PairValidator::new(settings.alpha, settings.beta);
    let pairs: Vec<&MatchSet> = candidates
        .iter()
        .flat_map(|list| list.match_sets.iter())
        .collect();
    let register = |(pair_ix, match_set): (usize, &&MatchSet)| {
        let robust = RobustHomography::new(settings.ransac_threshold)
            .seed(settings.consensus_seed.wrapping_add(pair_ix as u64));
        register_pair(match_set, features, &robust, &validator)
    };
    #[cfg(not(feature = "rayon"))]
    let outcomes: Vec<PairOutcome> = pairs.iter().enumerate().map(register).collect();
    #[cfg(feature = "rayon")]
    let outcomes: Vec<PairOutcome> = pairs.par_iter().enumerate().map(register).collect();

    let mut validated = vec![];
    let mut diagnostics = vec![];
    for outcome in outcomes {
        match outcome {
            PairOutcome::Validated(pair) => validated.push(pair),
            PairOutcome::Rejected(diagnostic) => diagnostics.push(diagnostic),
        }
    }
    info!(
        "{} of {} candidate pairs validated",
        validated.len(),
        pairs.len()
    );
    (validated, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pano_core::{
        bitarray::BitArray,
        nalgebra::{Matrix3, Point2},
        Correspondence,
    };

    fn known_homography() -> Homography {
        Homography(Matrix3::new(
            1.1, 0.05, 12.0, -0.03, 0.95, -7.0, 1e-4, 2e-4, 1.0,
        ))
    }

    fn project(homography: &Homography, points: &[(f64, f64)]) -> (Vec<KeyPoint>, Vec<KeyPoint>) {
        points
            .iter()
            .map(|&(x, y)| {
                let a = Point2::new(x, y);
                (KeyPoint(a), KeyPoint(homography.transform_point(a).unwrap()))
            })
            .unzip()
    }

    #[test]
    fn exact_four_points() {
        let h0 = known_homography();
        let (object, scene) = project(&h0, &[(10.0, 10.0), (90.0, 15.0), (85.0, 80.0), (12.0, 95.0)]);
        let registration = RobustHomography::new(5.0)
            .estimate(&object, &scene)
            .expect("four points in general position");
        assert_relative_eq!(registration.homography.0, h0.0, epsilon = 1e-6);
        assert_eq!(registration.inliers, vec![true; 4]);
    }

    #[test]
    fn fewer_than_four_points() {
        let (object, scene) = project(&known_homography(), &[(10.0, 10.0), (90.0, 15.0), (85.0, 80.0)]);
        assert!(RobustHomography::new(5.0).estimate(&object, &scene).is_none());
    }

    #[test]
    fn mismatched_lengths() {
        let (object, scene) = project(
            &known_homography(),
            &[(10.0, 10.0), (90.0, 15.0), (85.0, 80.0), (12.0, 95.0), (50.0, 50.0)],
        );
        assert!(RobustHomography::new(5.0)
            .estimate(&object, &scene[..4])
            .is_none());
    }

    #[test]
    fn outliers_are_masked() {
        let h0 = known_homography();
        let grid: Vec<(f64, f64)> = (0..6)
            .flat_map(|i| (0..5).map(move |j| (15.0 * i as f64 + 3.0, 17.0 * j as f64 + 5.0)))
            .collect();
        let (object, mut scene) = project(&h0, &grid);
        // Corrupt every fifth correspondence far beyond the threshold.
        for (ix, kp) in scene.iter_mut().enumerate() {
            if ix % 5 == 0 {
                kp.x += 40.0 + ix as f64;
                kp.y -= 25.0;
            }
        }
        let registration = RobustHomography::new(5.0)
            .estimate(&object, &scene)
            .expect("majority of matches agree");
        for (ix, &inlier) in registration.inliers.iter().enumerate() {
            assert_eq!(inlier, ix % 5 != 0, "correspondence {}", ix);
        }
        assert_relative_eq!(registration.homography.0, h0.0, epsilon = 1e-6);
    }

    #[test]
    fn validator_heuristic() {
        let validator = PairValidator::new(8.0, 0.3);
        assert!(validator.is_valid(20, 20));
        assert!(!validator.is_valid(10, 20));
        // The comparison is strict.
        assert!(!validator.is_valid(14, 20));
        assert_eq!(validator, PairValidator::default());
    }

    #[test]
    fn insufficient_pair_is_reported() {
        let features = vec![FeatureSet::default(), FeatureSet::default()];
        let outcome = register_pair(
            &MatchSet::new(0, 1, vec![]),
            &features,
            &RobustHomography::new(5.0),
            &PairValidator::default(),
        );
        assert_eq!(
            outcome,
            PairOutcome::Rejected(Diagnostic::InsufficientCorrespondences {
                source: 0,
                target: 1,
                count: 0
            })
        );
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let coincident = |x, y| {
            FeatureSet::new(vec![KeyPoint::new(x, y); 6], vec![BitArray::zeros(); 6]).unwrap()
        };
        let features = vec![coincident(5.0, 5.0), coincident(7.0, 7.0)];
        let matches = (0..6)
            .map(|ix| Correspondence {
                query: ix,
                train: ix,
                distance: 0.0,
            })
            .collect();
        let outcome = register_pair(
            &MatchSet::new(0, 1, matches),
            &features,
            &RobustHomography::new(5.0),
            &PairValidator::default(),
        );
        assert_eq!(
            outcome,
            PairOutcome::Rejected(Diagnostic::DegenerateGeometry {
                source: 0,
                target: 1
            })
        );
    }
}
