use std::path::Path;
use anyhow::Error;
use image::RgbImage;

/// load_rgb_image reads an image file from disk and decodes it into an RGB raster.
///
/// # Arguments
/// * `path` - path of the image file
///
/// # Returns
/// * `Result<RgbImage, Error>`
pub fn load_rgb_image(path: &Path) -> Result<RgbImage, Error> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            return Err(Error::from(e))
        }
    };

    Ok(img.to_rgb8())
}
