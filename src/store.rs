//! Collaborator interfaces named but not specified by the core pipeline:
//! blob storage (source bytes by id) and the native image-library
//! binding. Both are out of scope per the service's purpose and scope —
//! this module supplies one in-process implementation of each, good
//! enough to run and test the pipeline end to end, not a production
//! rendition of either.

use std::io::Cursor;
use std::path::PathBuf;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::params::{Extension, Params};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source-bytes-by-id lookup. The public front-end resolves ids to
/// whatever backs this in production (object storage, CDN origin, ...);
/// here it is a flat directory of files named by id.
pub trait BlobStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Bytes, StoreError>;
}

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for LocalBlobStore {
    fn get(&self, id: &str) -> Result<Bytes, StoreError> {
        let path = self.root.join(id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[derive(Debug, Error)]
pub enum NativeError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// The operation descriptor a worker hands to the native image library:
/// source bytes, target dimensions, optional transforms, output format.
#[derive(Clone)]
pub struct RenderTask {
    pub source: Bytes,
    pub width: u32,
    pub height: u32,
    pub blur_amount: Option<u8>,
    pub grayscale: bool,
    pub extension: Extension,
}

impl RenderTask {
    pub fn from_params(source: Bytes, params: &Params) -> Self {
        Self {
            source,
            width: params.width,
            height: params.height,
            blur_amount: params.blur_amount,
            grayscale: params.grayscale,
            extension: params.extension,
        }
    }
}

/// `Process(ctx, task) -> bytes | error` per spec.md §6. Invoked
/// synchronously from inside a pinned worker thread — it has no async
/// story of its own, matching the native binding's actual shape.
pub trait ImageLibrary: Send + Sync {
    fn process(&self, task: &RenderTask) -> Result<Vec<u8>, NativeError>;
}

/// Stand-in for the native binding, backed by the `image` crate. Resizes
/// with Lanczos3, applies an optional gaussian blur and/or grayscale
/// conversion, then encodes to JPEG or WebP.
pub struct LocalImageLibrary;

impl ImageLibrary for LocalImageLibrary {
    fn process(&self, task: &RenderTask) -> Result<Vec<u8>, NativeError> {
        let decoded = image::load_from_memory(&task.source)
            .map_err(|e| NativeError::Decode(e.to_string()))?;

        let mut out = decoded.resize_exact(task.width, task.height, FilterType::Lanczos3);

        if let Some(amount) = task.blur_amount {
            out = out.blur(amount as f32);
        }
        if task.grayscale {
            out = DynamicImage::ImageLuma8(out.to_luma8());
        }

        encode(&out, task.extension)
    }
}

fn encode(img: &DynamicImage, extension: Extension) -> Result<Vec<u8>, NativeError> {
    match extension {
        Extension::Jpeg => {
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, ImageFormat::Jpeg)
                .map_err(|e| NativeError::Encode(e.to_string()))?;
            Ok(buf.into_inner())
        }
        Extension::WebP => {
            let encoder = webp::Encoder::from_image(img)
                .map_err(|e| NativeError::Encode(e.to_string()))?;
            Ok(encoder.encode(80.0).to_vec())
        }
    }
}
