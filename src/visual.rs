//! Screenshot comparison using SSIM (Structural Similarity Index)
//!
//! The similarity map is thresholded into a mask of differing pixels, the
//! outer contours of that mask are boxed, and the boxes are drawn onto the
//! suspect screenshot so a reviewer can see where the pages diverge.

use crate::config::VisualConfig;
use crate::error::VisualError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage};
use image_compare::Algorithm;
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::point::Point;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);
const MASKED: Luma<u8> = Luma([255]);
const UNMASKED: Luma<u8> = Luma([0]);

/// Compares two screenshots and writes an annotated diff
pub trait VisualComparator {
    fn compare(&self, real: &Path, suspect: &Path, diff: &Path) -> Result<VisualComparison, VisualError>;
}

/// Bounding box of one differing area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Contour polygon area in px²
    pub area: f64,
}

/// In-memory result of comparing two images
#[derive(Debug, Clone)]
pub struct Analysis {
    /// SSIM clamped to [0, 1]
    pub score: f64,
    pub regions: Vec<Region>,
    /// Suspect image (at the common size) with regions boxed in red
    pub annotated: RgbImage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualComparison {
    pub score: f64,
    pub regions: Vec<Region>,
    /// None when the annotated image could not be written
    pub diff: Option<PathBuf>,
}

pub struct SsimComparator {
    mask_threshold: u8,
    min_region_area: f64,
}

impl SsimComparator {
    pub fn new(config: &VisualConfig) -> Self {
        Self {
            mask_threshold: config.mask_threshold,
            min_region_area: config.min_region_area,
        }
    }

    pub fn analyze(&self, real: &DynamicImage, suspect: &DynamicImage) -> Result<Analysis, VisualError> {
        let width = real.width().min(suspect.width());
        let height = real.height().min(suspect.height());
        if width == 0 || height == 0 {
            return Err(VisualError::Empty { width, height });
        }

        let real = fit(real, width, height);
        let suspect = fit(suspect, width, height);

        let similarity = image_compare::gray_similarity_structure(
            &Algorithm::MSSIMSimple,
            &real.to_luma8(),
            &suspect.to_luma8(),
        )
        .map_err(|e| VisualError::Ssim(format!("{:?}", e)))?;

        // 8-bit similarity map: 255 where the windows match perfectly
        let similarity_map = similarity.image.to_color_map().to_luma8();
        let mask = difference_mask(&similarity_map, self.mask_threshold);
        let regions = changed_regions(&mask, self.min_region_area);

        let mut annotated = suspect.to_rgb8();
        for region in &regions {
            highlight(&mut annotated, region);
        }

        let score = if similarity.score.is_finite() {
            similarity.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        debug!(score, regions = regions.len(), width, height, "compared screenshots");

        Ok(Analysis {
            score,
            regions,
            annotated,
        })
    }
}

impl VisualComparator for SsimComparator {
    fn compare(&self, real: &Path, suspect: &Path, diff: &Path) -> Result<VisualComparison, VisualError> {
        let real_image = load(real)?;
        let suspect_image = load(suspect)?;
        let analysis = self.analyze(&real_image, &suspect_image)?;

        let diff = match analysis.annotated.save(diff) {
            Ok(()) => Some(diff.to_path_buf()),
            Err(source) => {
                let e = VisualError::Write {
                    path: diff.to_path_buf(),
                    source,
                };
                warn!(error = %e, "diff image not written");
                None
            }
        };

        Ok(VisualComparison {
            score: analysis.score,
            regions: analysis.regions,
            diff,
        })
    }
}

fn load(path: &Path) -> Result<DynamicImage, VisualError> {
    image::open(path).map_err(|source| VisualError::Load {
        path: path.to_path_buf(),
        source,
    })
}

fn fit(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    }
}

/// Inverted binary threshold: values at or below `threshold` become 255
pub fn difference_mask(similarity_map: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(similarity_map.width(), similarity_map.height(), |x, y| {
        if similarity_map.get_pixel(x, y)[0] <= threshold {
            MASKED
        } else {
            UNMASKED
        }
    })
}

/// Bounding boxes of the outermost mask contours larger than `min_area`
pub fn changed_regions(mask: &GrayImage, min_area: f64) -> Vec<Region> {
    find_contours::<i32>(mask)
        .iter()
        .filter(|contour| contour.parent.is_none() && matches!(contour.border_type, BorderType::Outer))
        .filter_map(|contour| {
            let area = polygon_area(&contour.points);
            if area > min_area {
                bounding_region(&contour.points, area)
            } else {
                None
            }
        })
        .collect()
}

/// Shoelace area of a closed polygon
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

fn bounding_region(points: &[Point<i32>], area: f64) -> Option<Region> {
    let first = points.first()?;
    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y)),
    );
    Some(Region {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
        area,
    })
}

/// Two-pixel red box hugging the region
fn highlight(image: &mut RgbImage, region: &Region) {
    let (x, y) = (region.x as i32, region.y as i32);
    draw_hollow_rect_mut(image, Rect::at(x, y).of_size(region.width + 1, region.height + 1), HIGHLIGHT);
    if region.width > 1 && region.height > 1 {
        draw_hollow_rect_mut(
            image,
            Rect::at(x + 1, y + 1).of_size(region.width - 1, region.height - 1),
            HIGHLIGHT,
        );
    }
}
