use crate::error::MemError;
use crate::mem::Region;
use std::{fs, io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("could not read image: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Mem(#[from] MemError),
}

/// Load a raw program image verbatim into a zero-filled region of `size` bytes mapped at 0
pub fn load_image(path: impl AsRef<Path>, size: u32) -> Result<Region, ImageError> {
    let path = path.as_ref();
    let image = fs::read(path)?;
    tracing::debug!("loaded {} bytes from {}", image.len(), path.display());
    Ok(Region::with_image(0, size, &image)?)
}
