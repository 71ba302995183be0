//! Acquisition stage: read the selected file, decode it and render the
//! upscaled preview raster.

pub mod preprocessing;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageReader, RgbaImage};
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::error::AcquisitionError;

/// Extensions offered by the file picker
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// Preview rasters are always this many times larger than the decoded image
pub const PREVIEW_SCALE: u32 = 2;

/// Raw bytes of the file the user picked
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: Option<PathBuf>,
    bytes: Arc<Vec<u8>>,
}

impl SelectedFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AcquisitionError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AcquisitionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            bytes: Arc::new(bytes),
        })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            path: None,
            bytes: Arc::new(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File name for display, if the file came from disk
    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }
}

/// Fully decoded bitmap. Dimensions are only known once this exists.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: Arc<DynamicImage>,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode the selected file, guessing the format from its content
pub fn decode(file: &SelectedFile) -> Result<DecodedImage, AcquisitionError> {
    let image = ImageReader::new(Cursor::new(file.bytes()))
        .with_guessed_format()
        .map_err(|e| AcquisitionError::Decode(image::ImageError::IoError(e)))?
        .decode()?;
    debug!("Decoded {} ({}x{})", file.display_name(), image.width(), image.height());
    Ok(DecodedImage::new(image))
}

/// Upscaled (and optionally filtered) copy of a decoded image
#[derive(Debug, Clone)]
pub struct PreviewRaster {
    raster: RgbaImage,
}

impl PreviewRaster {
    pub fn render(decoded: &DecodedImage, config: &PreprocessConfig) -> Result<Self, AcquisitionError> {
        let (width, height) = (decoded.width(), decoded.height());
        let too_large = || AcquisitionError::TooLarge { width, height };
        let target_w = width.checked_mul(PREVIEW_SCALE).ok_or_else(too_large)?;
        let target_h = height.checked_mul(PREVIEW_SCALE).ok_or_else(too_large)?;

        let upscaled = preprocessing::upscale(decoded.image(), target_w, target_h);
        let raster = match &config.filter {
            Some(filter) => preprocessing::apply_filter(&upscaled, filter),
            None => upscaled,
        };

        Ok(Self { raster })
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    pub fn to_image(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.raster.clone())
    }
}

/// Output of the acquisition stage
#[derive(Debug, Clone)]
pub struct Acquired {
    pub decoded: DecodedImage,
    pub preview: Arc<PreviewRaster>,
}

/// Decode and render the preview in one step
pub fn acquire(file: &SelectedFile, config: &PreprocessConfig) -> Result<Acquired, AcquisitionError> {
    let decoded = decode(file)?;
    let preview = PreviewRaster::render(&decoded, config)?;
    Ok(Acquired {
        decoded,
        preview: Arc::new(preview),
    })
}
