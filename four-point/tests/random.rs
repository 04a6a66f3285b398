use approx::assert_relative_eq;
use four_point::{FourPoint, Homography};
use pano_core::{
    nalgebra::{Matrix3, Point2},
    sample_consensus::{Estimator, Model},
    FeatureMatch, KeyPoint,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

const SAMPLE_POINTS: usize = 16;
const RESIDUAL_THRESHOLD: f64 = 1e-6;
const IMAGE_SIZE: f64 = 640.0;

#[test]
fn randomized() {
    let mut rng = Pcg64::seed_from_u64(0);
    let successes = (0..1000).filter(|_| run_round(&mut rng)).count();
    eprintln!("successes: {}", successes);
    assert!(successes > 990);
}

#[test]
fn minimal_sample_recovers_transform() {
    let mut rng = Pcg64::seed_from_u64(1);
    let (homography, _) = some_test_data(&mut rng, 0);
    let matches = [(10.0, 10.0), (600.0, 40.0), (580.0, 500.0), (30.0, 620.0)].map(|(x, y)| {
        let a = Point2::new(x, y);
        FeatureMatch(KeyPoint(a), KeyPoint(homography.transform_point(a).unwrap()))
    });
    let estimate = FourPoint::new()
        .estimate(matches.iter().copied())
        .expect("four points in general position determine a homography");
    assert_relative_eq!(estimate.0, homography.0, epsilon = 1e-6);
}

#[test]
fn collinear_sample_is_rejected() {
    let matches = [(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (5.0, 40.0)].map(|(x, y)| {
        FeatureMatch(KeyPoint::new(x, y), KeyPoint::new(x + 3.0, y - 2.0))
    });
    assert!(FourPoint::new().from_matches(matches.iter().copied()).is_none());
}

#[test]
fn too_few_matches() {
    let matches = [(0.0, 0.0), (10.0, 3.0), (4.0, 20.0)]
        .map(|(x, y)| FeatureMatch(KeyPoint::new(x, y), KeyPoint::new(x, y)));
    assert!(FourPoint::new().from_matches(matches.iter().copied()).is_none());
}

#[test]
fn inverse_undoes_transform() {
    let homography = Homography(Matrix3::new(
        0.9, 0.1, 14.0, -0.05, 1.1, -3.0, 1e-4, -2e-4, 1.0,
    ));
    let inverse = homography.inverse().expect("transform is invertible");
    let point = Point2::new(120.0, 75.0);
    let back = inverse
        .transform_point(homography.transform_point(point).unwrap())
        .unwrap();
    assert_relative_eq!(back, point, epsilon = 1e-9);
    assert_relative_eq!((homography * inverse).0, Matrix3::identity(), epsilon = 1e-9);
}

fn run_round(rng: &mut Pcg64) -> bool {
    let mut success = true;
    let (_, matches) = some_test_data(rng, SAMPLE_POINTS);
    let homography = match FourPoint::new().from_matches(matches.iter().copied()) {
        Some(homography) => homography,
        None => return false,
    };
    for m in &matches {
        if homography.residual(m) > RESIDUAL_THRESHOLD {
            success = false;
            eprintln!("failed residual check: {}", homography.residual(m));
        }
    }
    success
}

/// Gets a random mild perspective transform and points related by it.
fn some_test_data(rng: &mut Pcg64, count: usize) -> (Homography, Vec<FeatureMatch>) {
    let homography = Homography(Matrix3::new(
        1.0 + rng.gen_range(-0.2..0.2),
        rng.gen_range(-0.2..0.2),
        rng.gen_range(-100.0..100.0),
        rng.gen_range(-0.2..0.2),
        1.0 + rng.gen_range(-0.2..0.2),
        rng.gen_range(-100.0..100.0),
        rng.gen_range(-2e-4..2e-4),
        rng.gen_range(-2e-4..2e-4),
        1.0,
    ));
    let matches = (0..count)
        .map(|_| {
            let a = Point2::new(rng.gen_range(0.0..IMAGE_SIZE), rng.gen_range(0.0..IMAGE_SIZE));
            let b = homography.transform_point(a).unwrap();
            FeatureMatch(KeyPoint(a), KeyPoint(b))
        })
        .collect();
    (homography, matches)
}
