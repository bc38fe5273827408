//! Still frames decoded from image files.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{CameraGeometry, PixelFormat};
use image::imageops::FilterType;

/// Decode an image, resize it to the camera geometry and lay it out in the
/// camera's pixel format
///
/// Bayer sensors receive the luma plane.
pub fn load_still(path: &Path, geometry: &CameraGeometry) -> Result<Vec<u8>> {
    let decoded = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?;
    let resized = decoded.resize_exact(geometry.width, geometry.height, FilterType::Triangle);

    let data = match geometry.format {
        PixelFormat::L8 | PixelFormat::BayerRggb8 => resized.to_luma8().into_raw(),
        PixelFormat::L16 => resized
            .to_luma16()
            .into_raw()
            .into_iter()
            .flat_map(u16::to_le_bytes)
            .collect(),
        PixelFormat::Rgb8 => resized.to_rgb8().into_raw(),
        PixelFormat::Bgr8 => swap_red_blue(resized.to_rgb8().into_raw(), 3),
        PixelFormat::Rgba8 => resized.to_rgba8().into_raw(),
        PixelFormat::Bgra8 => swap_red_blue(resized.to_rgba8().into_raw(), 4),
    };

    Ok(data)
}

fn swap_red_blue(mut data: Vec<u8>, channels: usize) -> Vec<u8> {
    for pixel in data.chunks_exact_mut(channels) {
        pixel.swap(0, 2);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_still_resizes_to_geometry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grey.png");
        image::GrayImage::from_pixel(16, 12, image::Luma([90u8]))
            .save(&path)
            .unwrap();

        let geometry = CameraGeometry::new(8, 6, PixelFormat::L8);
        let data = load_still(&path, &geometry).unwrap();
        assert_eq!(data.len(), geometry.frame_len());
        assert!(data.iter().all(|&v| (89..=91).contains(&v)));
    }

    #[test]
    fn test_bgr_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([200u8, 10, 0]))
            .save(&path)
            .unwrap();

        let geometry = CameraGeometry::new(2, 2, PixelFormat::Bgr8);
        let data = load_still(&path, &geometry).unwrap();
        assert_eq!(&data[0..3], &[0, 10, 200]);
    }

    #[test]
    fn test_missing_file() {
        let geometry = CameraGeometry::new(2, 2, PixelFormat::L8);
        assert!(load_still(Path::new("/nonexistent/frame.png"), &geometry).is_err());
    }
}
