use akaze::Akaze;
use image::DynamicImage;
use log::*;
use panorama::{
    extract_features, filter_by_distance_ratio, load_images, match_features, run_pipeline,
    MatchSet, PanoramaSettings, RobustHomography,
};
use pano_core::FeatureMatch;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Clone)]
#[structopt(name = "stitch", about = "Stitches overlapping photos into a panorama")]
struct Opt {
    /// The file the panorama is written to.
    ///
    /// The format is chosen from the extension.
    #[structopt(short, long, default_value = "result.jpg")]
    output: PathBuf,
    /// The file where settings are specified.
    ///
    /// This is in the format of `panorama::PanoramaSettings`. Missing fields use their defaults.
    #[structopt(short, long)]
    settings: Option<PathBuf>,
    /// Overrides the akaze detector threshold
    #[structopt(long)]
    threshold: Option<f64>,
    /// Overrides the inlier reprojection threshold in pixels
    #[structopt(long)]
    ransac_threshold: Option<f64>,
    /// Also write a visualization of the inlier matches between the first two images
    #[structopt(long)]
    matches: Option<PathBuf>,
    /// List of image files
    #[structopt(parse(from_os_str))]
    images: Vec<PathBuf>,
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();

    let mut settings = load_settings(&opt);
    if let Some(threshold) = opt.threshold {
        settings.akaze_threshold = threshold;
    }
    if let Some(ransac_threshold) = opt.ransac_threshold {
        settings.ransac_threshold = ransac_threshold;
    }
    debug!("settings: {:?}", settings);

    let images = match load_images(&opt.images) {
        Ok(images) => images,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &opt.matches {
        if images.len() >= 2 {
            let canvas = render_inlier_matches(&images[0], &images[1], &settings);
            match canvas.save(path) {
                Ok(()) => info!("wrote matches to {:?}", path),
                Err(e) => warn!("failed to write matches to {:?}: {}", path, e),
            }
        } else {
            warn!("match visualization needs at least two images");
        }
    }

    let panorama = match run_pipeline(&images, &settings) {
        Ok(panorama) => panorama,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if !panorama.excluded.is_empty() {
        warn!("images left out of the panorama: {:?}", panorama.excluded);
    }
    for diagnostic in &panorama.diagnostics {
        debug!("{:?}", diagnostic);
    }

    if let Err(e) = panorama.save(&opt.output) {
        error!("{}", e);
        std::process::exit(1);
    }
    info!(
        "wrote {}x{} panorama of images {:?} to {:?}",
        panorama.image.width(),
        panorama.image.height(),
        panorama.order,
        opt.output
    );
}

fn load_settings(opt: &Opt) -> PanoramaSettings {
    let settings = opt.settings.as_ref().and_then(|path| {
        let file = std::fs::File::open(path)
            .map_err(|e| warn!("failed to open settings {:?}: {}", path, e))
            .ok()?;
        serde_json::from_reader(file)
            .map_err(|e| warn!("failed to parse settings {:?}: {}", path, e))
            .ok()
    });
    if settings.is_some() {
        info!("loaded settings");
    } else {
        info!("used default settings");
    }
    settings.unwrap_or_default()
}

fn render_inlier_matches(
    a: &DynamicImage,
    b: &DynamicImage,
    settings: &PanoramaSettings,
) -> image::RgbaImage {
    let akaze = Akaze::new(settings.akaze_threshold);
    let features = extract_features(&[a.clone(), b.clone()], &akaze);
    let good = filter_by_distance_ratio(
        &match_features(&features[0], &features[1]),
        settings.match_ratio_threshold,
    );
    let matches: Vec<FeatureMatch> = MatchSet::new(0, 1, good)
        .feature_matches(&features[0], &features[1])
        .collect();
    let robust = RobustHomography::new(settings.ransac_threshold).seed(settings.consensus_seed);
    let inliers: Vec<FeatureMatch> = match robust.estimate_matches(&matches) {
        Some(registration) => matches
            .iter()
            .zip(&registration.inliers)
            .filter(|&(_, &inlier)| inlier)
            .map(|(&m, _)| m)
            .collect(),
        None => {
            warn!("no homography between the first two images, drawing every match");
            matches
        }
    };
    info!("drawing {} matches", inliers.len());
    stitch::render_matches(a, b, inliers)
}
