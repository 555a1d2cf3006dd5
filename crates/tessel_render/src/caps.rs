//! Renderer capabilities
//!
//! Snapshot reported by the backend at init; read-only afterwards.

use crate::texture::TextureFormat;
use bitflags::bitflags;
use tessel_core::RendererType;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CapFlags: u64 {
        const TEXTURE_COMPARE_LEQUAL = 0x0000_0001;
        const TEXTURE_COMPARE_ALL = 0x0000_0003;
        const TEXTURE_3D = 0x0000_0004;
        const VERTEX_ATTRIB_HALF = 0x0000_0008;
        const INSTANCING = 0x0000_0010;
        const RENDERER_MULTITHREADED = 0x0000_0020;
        const FRAGMENT_DEPTH = 0x0000_0040;
        const BLEND_INDEPENDENT = 0x0000_0080;
        const COMPUTE = 0x0000_0100;
        const FRAGMENT_ORDERING = 0x0000_0200;
        const SWAP_CHAIN = 0x0000_0400;
        const INDEX32 = 0x0000_0800;
    }
}

/// How a texture format is handled by the active backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FormatSupport {
    #[default]
    Unsupported = 0,
    Supported = 1,
    Emulated = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    pub renderer_type: RendererType,
    pub supported: CapFlags,
    pub emulated: CapFlags,
    pub max_texture_size: u16,
    pub max_views: u16,
    pub max_draw_calls: u32,
    pub max_texture_stages: u8,
    pub max_fb_attachments: u8,
    pub formats: [FormatSupport; TextureFormat::COUNT],
}

impl Caps {
    /// True when every flag in `flags` is supported natively or emulated.
    pub fn supports(&self, flags: CapFlags) -> bool {
        (self.supported | self.emulated).contains(flags)
    }

    pub fn format_support(&self, format: TextureFormat) -> FormatSupport {
        self.formats[format as usize]
    }

    pub fn is_format_usable(&self, format: TextureFormat) -> bool {
        self.format_support(format) != FormatSupport::Unsupported
    }
}
