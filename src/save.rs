use crate::prediction::{ImageSize, Prediction, PredictionError};
use image::{
    imageops::{self, FilterType},
    ImageFormat,
};
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Invalid prediction: {0}")]
    Prediction(#[from] PredictionError),
    #[error("Invalid target size {0}")]
    InvalidSize(ImageSize),
    #[error("Unsupported output format for {0:?}")]
    UnsupportedFormat(PathBuf),
    #[error("Cannot derive an output file name from {0:?}")]
    InvalidName(String),
    #[error("Failed to create directory {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to write {path:?}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Save task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    pub filter: ResizeFilter,
}

/// Maps a file extension onto a format able to encode 8-bit grayscale.
pub fn format_for_extension(extension: &str) -> Option<ImageFormat> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "bmp" => Some(ImageFormat::Bmp),
        "tif" | "tiff" => Some(ImageFormat::Tiff),
        "pgm" => Some(ImageFormat::Pnm),
        "tga" => Some(ImageFormat::Tga),
        _ => None,
    }
}

pub fn resolve_format(path: &Path) -> Result<ImageFormat, SaveError> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .and_then(format_for_extension)
        .ok_or_else(|| SaveError::UnsupportedFormat(path.to_path_buf()))
}

/// Saves a prediction map as a grayscale image, resized to `original_size`
/// when one is given.
pub fn save_prediction(
    prediction: &Prediction,
    save_path: impl AsRef<Path>,
    original_size: Option<ImageSize>,
) -> Result<(), SaveError> {
    save_prediction_with(
        prediction,
        save_path,
        original_size,
        &SaveOptions::default(),
    )
}

#[instrument(skip(prediction, save_path))]
pub fn save_prediction_with(
    prediction: &Prediction,
    save_path: impl AsRef<Path>,
    original_size: Option<ImageSize>,
    options: &SaveOptions,
) -> Result<(), SaveError> {
    let save_path = save_path.as_ref();
    let format = resolve_format(save_path)?;

    if let Some(size) = original_size.filter(ImageSize::is_empty) {
        return Err(SaveError::InvalidSize(size));
    }

    let mut image = prediction.to_luma();
    if let Some(size) = original_size.filter(|size| *size != prediction.size()) {
        tracing::debug!("Resizing prediction from {} to {}", prediction.size(), size);
        image = imageops::resize(&image, size.width, size.height, options.filter.into());
    }

    if let Some(parent) = save_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).map_err(|source| SaveError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    image
        .save_with_format(save_path, format)
        .map_err(|source| SaveError::Encode {
            path: save_path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        "Saved {}x{} prediction to {:?}",
        image.height(),
        image.width(),
        save_path
    );

    Ok(())
}
