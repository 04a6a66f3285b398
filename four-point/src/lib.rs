use core::ops::Mul;
use float_ord::FloatOrd;
use pano_core::{
    nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3},
    sample_consensus::{Estimator, Model},
    FeatureMatch, ImagePoint, KeyPoint,
};

/// The number of correspondences that fully determine a homography.
pub const MIN_CORRESPONDENCES: usize = 4;

/// A 3x3 projective transform taking points on image A's plane to image B's plane.
///
/// Homographies produced by this crate are scaled so that the bottom right entry is `1`
/// whenever that entry is not (numerically) zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    pub fn from_translation(dx: f64, dy: f64) -> Self {
        Self(Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0))
    }

    /// Rescales the matrix so that its bottom right entry is `1`.
    ///
    /// Falls back to unit Frobenius norm when that entry vanishes.
    pub fn normalized(self) -> Option<Self> {
        let scale = self.0[(2, 2)];
        let scale = if scale.abs() > 1e-12 {
            scale
        } else {
            self.0.norm()
        };
        if scale == 0.0 || !scale.is_finite() {
            return None;
        }
        let mat = self.0 / scale;
        mat.iter().all(|v| v.is_finite()).then(|| Self(mat))
    }

    pub fn inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self).and_then(Self::normalized)
    }

    /// Maps a point through the transform.
    ///
    /// Returns `None` if the point is sent to infinity.
    pub fn transform_point(&self, point: Point2<f64>) -> Option<Point2<f64>> {
        let projected = self.0 * point.to_homogeneous();
        if projected.z.abs() < 1e-12 {
            None
        } else {
            Some(Point2::new(projected.x / projected.z, projected.y / projected.z))
        }
    }

    /// The distance in pixels between the transformed query keypoint and the train keypoint.
    pub fn reprojection_error(&self, FeatureMatch(a, b): &FeatureMatch) -> f64 {
        self.transform_point(a.image_point())
            .map(|p| (p - b.image_point()).norm())
            .unwrap_or(f64::INFINITY)
    }

    /// The matrix in row-major order, as image warping routines expect it.
    pub fn to_row_major(&self) -> [f64; 9] {
        let m = &self.0;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }
}

/// `a * b` applies `b` first, then `a`.
impl Mul for Homography {
    type Output = Homography;

    fn mul(self, rhs: Homography) -> Homography {
        let product = Homography(self.0 * rhs.0);
        product.normalized().unwrap_or(product)
    }
}

impl Model<FeatureMatch> for Homography {
    fn residual(&self, data: &FeatureMatch) -> f64 {
        self.reprojection_error(data)
    }
}

/// Hartley normalization: translate the centroid to the origin and scale so that the
/// average distance from it is `sqrt(2)`.
fn normalizing_transform(points: impl Iterator<Item = Point2<f64>> + Clone) -> Option<Matrix3<f64>> {
    let (sum, count) = points
        .clone()
        .fold((Vector3::zeros(), 0usize), |(sum, count), p| {
            (sum + p.to_homogeneous(), count + 1)
        });
    if count == 0 {
        return None;
    }
    let centroid = Point2::new(sum.x / count as f64, sum.y / count as f64);
    let mean_distance = points.map(|p| (p - centroid).norm()).sum::<f64>() / count as f64;
    if mean_distance < 1e-12 {
        return None;
    }
    let s = core::f64::consts::SQRT_2 / mean_distance;
    Some(Matrix3::new(
        s,
        0.0,
        -s * centroid.x,
        0.0,
        s,
        -s * centroid.y,
        0.0,
        0.0,
        1.0,
    ))
}

fn encode_projective_equations(
    matches: impl Iterator<Item = FeatureMatch>,
    ta: &Matrix3<f64>,
    tb: &Matrix3<f64>,
) -> SMatrix<f64, 9, 9> {
    let mut ata = SMatrix::<f64, 9, 9>::zeros();
    for FeatureMatch(a, b) in matches {
        let a = ta * a.image_point().to_homogeneous();
        let b = tb * b.image_point().to_homogeneous();
        let (x, y) = (a.x / a.z, a.y / a.z);
        let (u, v) = (b.x / b.z, b.y / b.z);
        let rx = SVector::<f64, 9>::from_column_slice(&[
            -x,
            -y,
            -1.0,
            0.0,
            0.0,
            0.0,
            u * x,
            u * y,
            u,
        ]);
        let ry = SVector::<f64, 9>::from_column_slice(&[
            0.0,
            0.0,
            0.0,
            -x,
            -y,
            -1.0,
            v * x,
            v * y,
            v,
        ]);
        ata += rx * rx.transpose() + ry * ry.transpose();
    }
    ata
}

fn collinear(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    let ab = b - a;
    let ac = c - a;
    let scale = ab.norm() * ac.norm();
    scale < 1e-12 || (ab.x * ac.y - ab.y * ac.x).abs() < 1e-9 * scale
}

fn any_three_collinear(points: &[Point2<f64>; MIN_CORRESPONDENCES]) -> bool {
    (0..MIN_CORRESPONDENCES).any(|skip| {
        let mut rest = (0..MIN_CORRESPONDENCES).filter(|&ix| ix != skip).map(|ix| points[ix]);
        match (rest.next(), rest.next(), rest.next()) {
            (Some(a), Some(b), Some(c)) => collinear(a, b, c),
            _ => false,
        }
    })
}

/// A minimal sample is degenerate if any three of its points are collinear on either image.
fn degenerate_minimal_sample(sample: &[FeatureMatch; MIN_CORRESPONDENCES]) -> bool {
    any_three_collinear(&sample.map(|FeatureMatch(a, _)| a.image_point()))
        || any_three_collinear(&sample.map(|FeatureMatch(_, b)| b.image_point()))
}

/// Estimates a [`Homography`] with the normalized
/// [direct linear transform](https://en.wikipedia.org/wiki/Direct_linear_transformation)
/// as described by Richard Hartley and Andrew Zisserman.
///
/// With exactly four matches this is the minimal solver used inside sample consensus.
/// With more matches it produces the algebraic least-squares fit, which is used to refine
/// a consensus model from all of its inliers.
#[derive(Copy, Clone, Debug)]
pub struct FourPoint {
    pub epsilon: f64,
    pub iterations: usize,
}

impl FourPoint {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_matches<I>(&self, data: I) -> Option<Homography>
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        let count = data.clone().count();
        if count < MIN_CORRESPONDENCES {
            return None;
        }
        if count == MIN_CORRESPONDENCES {
            let mut sample = [FeatureMatch(KeyPoint::new(0.0, 0.0), KeyPoint::new(0.0, 0.0));
                MIN_CORRESPONDENCES];
            for (slot, m) in sample.iter_mut().zip(data.clone()) {
                *slot = m;
            }
            if degenerate_minimal_sample(&sample) {
                return None;
            }
        }
        let ta = normalizing_transform(data.clone().map(|FeatureMatch(a, _)| a.image_point()))?;
        let tb = normalizing_transform(data.clone().map(|FeatureMatch(_, b)| b.image_point()))?;
        let ata = encode_projective_equations(data, &ta, &tb);
        let eigens = ata.try_symmetric_eigen(self.epsilon, self.iterations)?;
        let eigenvector = eigens
            .eigenvalues
            .iter()
            .enumerate()
            .min_by_key(|&(_, &n)| FloatOrd(n))
            .map(|(ix, _)| eigens.eigenvectors.column(ix).into_owned())?;
        let normalized = Matrix3::from_row_slice(eigenvector.as_slice());
        let mat = tb.try_inverse()? * normalized * ta;
        let homography = Homography(mat).normalized()?;
        let unit = homography.0 / homography.0.norm();
        if unit.determinant().abs() < 1e-12 {
            return None;
        }
        Some(homography)
    }
}

impl Default for FourPoint {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
        }
    }
}

impl Estimator<FeatureMatch> for FourPoint {
    type Model = Homography;
    type ModelIter = Option<Homography>;
    const MIN_SAMPLES: usize = MIN_CORRESPONDENCES;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        self.from_matches(data)
    }
}
