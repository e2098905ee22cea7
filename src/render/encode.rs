//! Image encoding for page rasters

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use super::backend::Raster;
use super::policy::{OutputFormat, RenderConfig};

/// Encode an RGB raster per the config's format and quality
pub fn encode_raster(raster: &Raster, config: &RenderConfig) -> Result<Vec<u8>, image::ImageError> {
    let (width, height) = raster.dimensions();
    let mut output = Vec::new();

    match config.format {
        OutputFormat::Png => {
            let (compression, filter) = if config.optimize_output {
                (CompressionType::Best, FilterType::Adaptive)
            } else {
                (CompressionType::Fast, FilterType::Sub)
            };
            PngEncoder::new_with_quality(&mut output, compression, filter).write_image(
                raster.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Jpeg => {
            let quality = config.jpeg_quality().unwrap_or(85);
            JpegEncoder::new_with_quality(&mut output, quality).write_image(
                raster.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
    }

    Ok(output)
}
