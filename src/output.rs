// SPDX-License-Identifier: GPL-3.0-only

//! Writing captured images to disk.

use crate::error::Error;
use crate::settings::ImageFormatSetting;
use chrono::{Local, NaiveDateTime};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};

/// `screenshot_YYYYMMDD_HHMMSS.<extension>`
#[must_use]
pub fn filename_at(time: NaiveDateTime, extension: &str) -> String {
    format!("screenshot_{}.{extension}", time.format("%Y%m%d_%H%M%S"))
}

#[must_use]
pub fn timestamped_filename(format: ImageFormatSetting) -> String {
    filename_at(Local::now().naive_local(), format.extension())
}

/// Format implied by a file extension, PNG when unknown
#[must_use]
pub fn format_for_path(path: &Path) -> ImageFormatSetting {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            ImageFormatSetting::Jpeg
        }
        _ => ImageFormatSetting::Png,
    }
}

/// # Errors
/// Returns [`Error::Encode`] if the encoder rejects the image
pub fn encode(image: &DynamicImage, format: ImageFormatSetting, quality: u8) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    match format {
        ImageFormatSetting::Png => image.write_with_encoder(PngEncoder::new(&mut bytes))?,
        ImageFormatSetting::Jpeg => {
            // JPEG has no alpha channel
            let quality = quality.clamp(1, 100);
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))?;
        }
    }
    Ok(bytes)
}

/// Writes already encoded bytes; a partially written file is removed again
///
/// # Errors
/// Returns [`Error::SaveScreenshot`] on I/O failure
pub fn write_encoded(bytes: &[u8], path: &Path) -> Result<(), Error> {
    fs::write(path, bytes).map_err(|error| {
        let _ = fs::remove_file(path);
        Error::SaveScreenshot {
            error,
            context: "writing screenshot",
        }
    })?;
    log::info!("Screenshot saved to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// # Errors
/// Returns [`Error::SaveScreenshot`] if the directory cannot be created
pub fn ensure_directory(directory: &Path) -> Result<(), Error> {
    if !directory.is_dir() {
        log::info!("Creating screenshot directory: {}", directory.display());
        fs::create_dir_all(directory).map_err(|error| Error::SaveScreenshot {
            error,
            context: "creating screenshot directory",
        })?;
    }
    Ok(())
}

/// # Errors
/// Returns `Error` if encoding or writing fails
pub fn save_image(
    image: &DynamicImage,
    path: &Path,
    format: ImageFormatSetting,
    quality: u8,
) -> Result<(), Error> {
    let bytes = encode(image, format, quality)?;
    write_encoded(&bytes, path)
}

/// Saves under a timestamped name inside `directory`, creating it first
///
/// # Errors
/// Returns `Error` if the directory cannot be created or the image cannot be saved
pub fn save_to_directory(
    image: &DynamicImage,
    directory: &Path,
    format: ImageFormatSetting,
    quality: u8,
) -> Result<PathBuf, Error> {
    ensure_directory(directory)?;
    let path = directory.join(timestamped_filename(format));
    save_image(image, &path, format, quality)?;
    Ok(path)
}

/// [`save_image`] on the blocking thread pool, so encoding a large capture
/// does not stall the caller's event loop
#[must_use]
pub fn save_in_background(
    image: DynamicImage,
    path: PathBuf,
    format: ImageFormatSetting,
    quality: u8,
) -> tokio::task::JoinHandle<Result<PathBuf, Error>> {
    tokio::task::spawn_blocking(move || {
        save_image(&image, &path, format, quality)?;
        Ok(path)
    })
}
