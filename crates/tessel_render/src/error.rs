use crate::texture::TextureFormat;
use crate::vertex::Attrib;
use tessel_core::HandleError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors surfaced by the recorder.
///
/// Transient buffer exhaustion through [`crate::Renderer::alloc_transient_buffers`]
/// is reported as `None`, not as an error: callers skip the draw for the frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error("{what}: data is empty")]
    EmptyData { what: &'static str },

    #[error("{what}: expected {expected} bytes, got {actual}")]
    DataSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("vertex declaration: `{op}` is not allowed while {phase}")]
    DeclState { op: &'static str, phase: &'static str },

    #[error("vertex declaration: adding {bytes} bytes to stride {stride} overflows")]
    StrideOverflow { stride: u16, bytes: u16 },

    #[error("vertex declaration: attribute {0:?} added twice")]
    DuplicateAttrib(Attrib),

    #[error("vertex declaration: attribute {attrib:?} has {num} components (1..=4 allowed)")]
    ComponentCount { attrib: Attrib, num: u8 },

    #[error("vertex declaration: attribute {0:?} is not present")]
    MissingAttrib(Attrib),

    #[error("vertex type is {actual} bytes but its declaration has stride {expected}")]
    StrideMismatch { expected: usize, actual: usize },

    #[error("vertex convert: {what} is {actual} bytes, expected {expected}")]
    ConvertMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("transient {what} buffer exhausted: requested {requested} bytes, {available} available")]
    TransientExhausted {
        what: &'static str,
        requested: usize,
        available: usize,
    },

    #[error("transient region is not aligned for a vertex type with alignment {align}")]
    Misaligned { align: usize },

    #[error("transient buffer from frame {allocated} used in frame {current}")]
    StaleTransient { allocated: u32, current: u32 },

    #[error("instance data stride {0} must be a non-zero multiple of 16")]
    InstanceStride(u16),

    #[error("draw call limit of {0} reached for this frame")]
    DrawCallLimit(u32),

    #[error("submit without a program bound")]
    NoProgram,

    #[error("texture stage {stage} out of range (max {max})")]
    TextureStage { stage: u8, max: u8 },

    #[error("uniform `{name}` holds {capacity} values, {actual} given")]
    UniformSize {
        name: String,
        capacity: usize,
        actual: usize,
    },

    #[error("texture format {0:?} is not supported by this renderer")]
    UnsupportedFormat(TextureFormat),

    #[error("texture size {width}x{height} is invalid (max {max})")]
    TextureSize { width: u16, height: u16, max: u16 },

    #[error("renderer does not support {0}")]
    Unsupported(&'static str),

    #[error("frame buffer attachment {attachment} out of range ({count} attachments)")]
    Attachment { attachment: u8, count: usize },

    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
