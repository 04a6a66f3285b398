use crate::{
    candidate_lists, extract_features, filter_by_distance_ratio, match_features,
    register_candidates, register_pair, AssemblyGraph, Compositor, Diagnostic, FeatureExtractor,
    PairOutcome, PairValidator, PanoramaError, PanoramaSettings, Result, RobustHomography,
};
use akaze::Akaze;
use four_point::Homography;
use image::{DynamicImage, RgbaImage};
use log::*;
use pano_core::{FeatureSet, MatchSet};
use std::path::{Path, PathBuf};

/// The result of a stitching run.
#[derive(Debug, Clone)]
pub struct Panorama {
    /// The composited canvas, in the frame of `order[0]`. Uncovered pixels are transparent.
    pub image: RgbaImage,
    /// The images on the canvas, in the order they were composited.
    pub order: Vec<usize>,
    /// Input images that could not be connected to the panorama.
    pub excluded: Vec<usize>,
    /// Every non-fatal outcome of the run, in the order it was recorded.
    pub diagnostics: Vec<Diagnostic>,
}

impl Panorama {
    /// Writes the panorama, choosing the format from the extension.
    ///
    /// Formats without transparency receive the panorama flattened to RGB.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let image = DynamicImage::ImageRgba8(self.image.clone());
        let opaque = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
            .unwrap_or(false);
        let saved = if opaque {
            DynamicImage::ImageRgb8(image.to_rgb8()).save(path)
        } else {
            image.save(path)
        };
        saved.map_err(|source| PanoramaError::Write {
            path: path.to_owned(),
            source,
        })
    }
}

/// Opens every image, failing on the first one that can't be read.
pub fn load_images<P>(paths: impl IntoIterator<Item = P>) -> Result<Vec<DynamicImage>>
where
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|path| {
            let path = path.as_ref();
            let image = image::open(path).map_err(|source| PanoramaError::ImageLoad {
                path: PathBuf::from(path),
                source,
            })?;
            info!("loaded {:?} ({}x{})", path, image.width(), image.height());
            Ok(image)
        })
        .collect()
}

/// Stitches `images` into a panorama, extracting features with AKAZE.
pub fn run_pipeline(images: &[DynamicImage], settings: &PanoramaSettings) -> Result<Panorama> {
    run_pipeline_with(images, &Akaze::new(settings.akaze_threshold), settings)
}

/// Stitches `images` into a panorama using the given feature extractor.
pub fn run_pipeline_with<E>(
    images: &[DynamicImage],
    extractor: &E,
    settings: &PanoramaSettings,
) -> Result<Panorama>
where
    E: FeatureExtractor + ?Sized,
{
    if images.len() < 2 {
        return Err(PanoramaError::Input(images.len()));
    }
    let features = extract_features(images, extractor);
    stitch_features(images, &features, settings)
}

/// Stitches `images` given the features already extracted from each of them.
///
/// `features[i]` must belong to `images[i]`.
pub fn stitch_features(
    images: &[DynamicImage],
    features: &[FeatureSet],
    settings: &PanoramaSettings,
) -> Result<Panorama> {
    if images.len() < 2 {
        return Err(PanoramaError::Input(images.len()));
    }

    info!("matching {} images", images.len());
    let candidates = candidate_lists(features, settings);

    info!("estimating homographies");
    let (validated, mut diagnostics) = register_candidates(&candidates, features, settings);
    let graph = AssemblyGraph::new(images.len(), validated);
    debug!("images on no validated pair: {:?}", graph.isolated());

    let mut order = graph.order();
    if order.is_empty() {
        warn!("no image pair could be registered, the panorama is the first image alone");
        order.push(0);
    }
    debug!("assembly order: {:?}", order);

    let mut compositor = Compositor::new(order[0], images.get(order[0]))?;
    let mut attempted = vec![];
    let mut pending = order[1..].to_vec();
    // Images whose only validated links lead to images placed later are retried until a
    // pass places nothing.
    loop {
        let mut deferred = vec![];
        for &next in &pending {
            match registering_homography(
                &graph,
                &compositor,
                next,
                features,
                settings,
                &mut attempted,
                &mut diagnostics,
            ) {
                Some((anchor, to_anchor)) => {
                    compositor.add(next, images.get(next), anchor, to_anchor)?;
                }
                None => deferred.push(next),
            }
        }
        if deferred.is_empty() || deferred.len() == pending.len() {
            for next in &deferred {
                warn!("image {} has no validated transform onto the canvas", next);
            }
            break;
        }
        pending = deferred;
    }

    let order = compositor.order();
    let excluded: Vec<usize> = (0..images.len()).filter(|ix| !order.contains(ix)).collect();
    if !excluded.is_empty() {
        warn!("images {:?} are not connected to the panorama", excluded);
        diagnostics.push(Diagnostic::DisconnectedAssembly {
            excluded: excluded.clone(),
        });
    }
    info!("composited images {:?}", order);

    Ok(Panorama {
        image: compositor.finish(),
        order,
        excluded,
        diagnostics,
    })
}

/// Finds an already placed image and the homography taking `next` into it.
///
/// A validated pair with the previously placed image is preferred, then a validated pair
/// with any placed image. Failing both, `next` is registered against the previously placed
/// image directly, once per pair, and the result is only used if it passes validation.
fn registering_homography(
    graph: &AssemblyGraph,
    compositor: &Compositor,
    next: usize,
    features: &[FeatureSet],
    settings: &PanoramaSettings,
    attempted: &mut Vec<(usize, usize)>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<(usize, Homography)> {
    let prev = compositor.last();
    if let Some(homography) = graph.homography(next, prev) {
        return Some((prev, homography));
    }
    if let Some(link) = graph.link_to_any(next, &compositor.order()) {
        debug!("image {} links to placed image {}", next, link.0);
        return Some(link);
    }
    if attempted.contains(&(next, prev)) {
        return None;
    }
    attempted.push((next, prev));
    match register_directly(next, prev, features, settings) {
        PairOutcome::Validated(pair) => {
            debug!("registered image {} to {} directly", next, prev);
            Some((prev, pair.homography))
        }
        PairOutcome::Rejected(diagnostic) => {
            diagnostics.push(diagnostic);
            None
        }
    }
}

fn register_directly(
    source: usize,
    target: usize,
    features: &[FeatureSet],
    settings: &PanoramaSettings,
) -> PairOutcome {
    let good = match (features.get(source), features.get(target)) {
        (Some(source_features), Some(target_features)) => filter_by_distance_ratio(
            &match_features(source_features, target_features),
            settings.match_ratio_threshold,
        ),
        _ => Vec::new(),
    };
    register_pair(
        &MatchSet::new(source, target, good),
        features,
        &RobustHomography::new(settings.ransac_threshold).seed(settings.consensus_seed),
        &PairValidator::new(settings.alpha, settings.beta),
    )
}
