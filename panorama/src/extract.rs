use akaze::Akaze;
use image::DynamicImage;
use log::*;
use pano_core::{FeatureSet, KeyPoint};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Anything that can detect and describe keypoints on an image.
///
/// Extraction must be deterministic for fixed extractor parameters.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, image: &DynamicImage) -> FeatureSet;
}

impl FeatureExtractor for Akaze {
    fn extract(&self, image: &DynamicImage) -> FeatureSet {
        let (keypoints, descriptors) = Akaze::extract(self, image);
        let keypoints = keypoints
            .into_iter()
            .map(|kp| KeyPoint::new(kp.point.0 as f64, kp.point.1 as f64))
            .collect();
        // akaze emits one descriptor per keypoint
        FeatureSet::new(keypoints, descriptors).unwrap_or_default()
    }
}

/// Extracts the features of every image, keeping the input order.
pub fn extract_features<E>(images: &[DynamicImage], extractor: &E) -> Vec<FeatureSet>
where
    E: FeatureExtractor + ?Sized,
{
    let extract = |(ix, image): (usize, &DynamicImage)| {
        let features = extractor.extract(image);
        info!("image {} has {} features", ix, features.len());
        features
    };
    #[cfg(not(feature = "rayon"))]
    let features = images.iter().enumerate().map(extract).collect();
    #[cfg(feature = "rayon")]
    let features = images.par_iter().enumerate().map(extract).collect();
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shareable<T: Send + Sync + ?Sized>() {}

    #[test]
    fn extractors_can_move_between_threads() {
        shareable::<dyn FeatureExtractor>();
        shareable::<Akaze>();
    }

    #[test]
    fn features_keep_image_order() {
        struct Width;
        impl FeatureExtractor for Width {
            fn extract(&self, image: &DynamicImage) -> FeatureSet {
                FeatureSet::new(
                    vec![KeyPoint::new(image.width() as f64, 0.0)],
                    vec![bitarray::BitArray::zeros()],
                )
                .unwrap_or_default()
            }
        }
        let images: Vec<DynamicImage> = (1..=3)
            .map(|width| DynamicImage::new_rgba8(width, 1))
            .collect();
        let features = extract_features(&images, &Width);
        let widths: Vec<f64> = features.iter().map(|f| f.keypoint(0).x).collect();
        assert_eq!(widths, vec![1.0, 2.0, 3.0]);
    }
}
