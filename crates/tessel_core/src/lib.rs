//! Tessel Core
//!
//! Contains the pieces every other tessel crate leans on:
//! - Generation-tagged resource handles and the slot arena behind them
//! - Renderer backend identification
//! - Per-frame allocation tracking

pub mod handle;
pub mod memory;

use serde::{Deserialize, Serialize};

pub use handle::{Handle, HandleError, HandlePool, ResourceKind};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Renderer backend type.
///
/// Discriminants are part of the public numeric contract and must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RendererType {
    /// Headless backend: consumes frames without touching a GPU
    #[default]
    Null = 0,
    Direct3D9 = 1,
    Direct3D11 = 2,
    Direct3D12 = 3,
    Metal = 4,
    OpenGLES = 5,
    OpenGL = 6,
    Vulkan = 7,
}

impl RendererType {
    pub const COUNT: usize = 8;

    pub fn name(self) -> &'static str {
        match self {
            RendererType::Null => "Null",
            RendererType::Direct3D9 => "Direct3D 9",
            RendererType::Direct3D11 => "Direct3D 11",
            RendererType::Direct3D12 => "Direct3D 12",
            RendererType::Metal => "Metal",
            RendererType::OpenGLES => "OpenGL ES",
            RendererType::OpenGL => "OpenGL",
            RendererType::Vulkan => "Vulkan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn renderer_type_values() {
        assert_eq!(RendererType::Null as u8, 0);
        assert_eq!(RendererType::Direct3D9 as u8, 1);
        assert_eq!(RendererType::Direct3D11 as u8, 2);
        assert_eq!(RendererType::OpenGLES as u8, 5);
        assert_eq!(RendererType::OpenGL as u8, 6);
        assert_eq!(RendererType::Vulkan as u8 as usize, RendererType::COUNT - 1);
        assert_eq!(RendererType::default(), RendererType::Null);
    }
}
