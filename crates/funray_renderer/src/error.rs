//! Renderer errors.

use funray_core::{ConfigError, TextureError};
use thiserror::Error;

/// Everything that can stop a render from starting.
///
/// Cancellation is not an error; it is reported as
/// [`RenderOutcome::Cancelled`](crate::RenderOutcome).
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("Degenerate camera: {0}")]
    DegenerateCamera(&'static str),

    #[error("Object {object} references material {material}, but the scene has {count} materials")]
    UnknownMaterial {
        object: usize,
        material: usize,
        count: usize,
    },

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("Out of memory allocating {what} ({pixels} pixels)")]
    OutOfMemory { what: &'static str, pixels: usize },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type RenderResult<T> = Result<T, RenderError>;
