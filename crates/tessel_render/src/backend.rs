//! Rendering backend abstraction
//!
//! The recorder validates and encodes; a backend owns the GPU objects and
//! consumes finished frames. `NullBackend` is the headless implementation
//! used by tests, tools and the runtime's smoke loop.

use crate::caps::{CapFlags, Caps, FormatSupport};
use crate::error::Result;
use crate::frame::FrameData;
use crate::resource::{
    FrameBufferHandle, IndexBufferHandle, ProgramHandle, ShaderHandle, ShaderStage,
    TextureHandle, UniformHandle, UniformType, VertexBufferHandle,
};
use crate::settings::{InitSettings, PlatformData, ResetFlags};
use crate::texture::{TextureFlags, TextureFormat, TextureInfo};
use crate::vertex::VertexDecl;
use crate::view::MAX_VIEWS;
use tessel_core::RendererType;

/// Resource lifecycle events forwarded to the backend as they happen.
#[derive(Debug, Clone, Copy)]
pub enum ResourceCommand<'a> {
    CreateVertexBuffer {
        handle: VertexBufferHandle,
        data: &'a [u8],
        decl: &'a VertexDecl,
    },
    CreateIndexBuffer {
        handle: IndexBufferHandle,
        data: &'a [u8],
        index32: bool,
    },
    CreateShader {
        handle: ShaderHandle,
        stage: ShaderStage,
        data: &'a [u8],
    },
    CreateProgram {
        handle: ProgramHandle,
        vs: ShaderHandle,
        fs: ShaderHandle,
    },
    CreateTexture {
        handle: TextureHandle,
        info: TextureInfo,
        flags: TextureFlags,
        data: Option<&'a [u8]>,
    },
    CreateFrameBuffer {
        handle: FrameBufferHandle,
        attachments: &'a [TextureHandle],
    },
    CreateUniform {
        handle: UniformHandle,
        name: &'a str,
        ty: UniformType,
        num: u16,
    },
    DestroyVertexBuffer(VertexBufferHandle),
    DestroyIndexBuffer(IndexBufferHandle),
    DestroyShader(ShaderHandle),
    DestroyProgram(ProgramHandle),
    DestroyTexture(TextureHandle),
    DestroyFrameBuffer(FrameBufferHandle),
    DestroyUniform(UniformHandle),
}

impl ResourceCommand<'_> {
    /// Bytes uploaded by this command.
    pub fn upload_size(&self) -> usize {
        match self {
            ResourceCommand::CreateVertexBuffer { data, .. }
            | ResourceCommand::CreateIndexBuffer { data, .. }
            | ResourceCommand::CreateShader { data, .. } => data.len(),
            ResourceCommand::CreateTexture { data, .. } => data.map_or(0, <[u8]>::len),
            _ => 0,
        }
    }
}

pub trait RendererBackend {
    fn renderer_type(&self) -> RendererType;

    /// Bring the device up and report what it can do.
    fn init(&mut self, settings: &InitSettings, platform: &PlatformData) -> Result<Caps>;

    fn reset(&mut self, width: u32, height: u32, flags: ResetFlags) -> Result<()>;

    fn execute(&mut self, command: ResourceCommand<'_>) -> Result<()>;

    fn submit(&mut self, frame: &FrameData<'_>) -> Result<()>;

    fn shutdown(&mut self) {}
}

/// Capabilities of a device with no hardware limits beyond the settings.
pub fn probe_capabilities(renderer: RendererType, settings: &InitSettings) -> Caps {
    let mut formats = [FormatSupport::Supported; TextureFormat::COUNT];
    for format in TextureFormat::ALL {
        if format.is_marker() {
            formats[format as usize] = FormatSupport::Unsupported;
        }
    }

    Caps {
        renderer_type: renderer,
        supported: CapFlags::INSTANCING
            | CapFlags::INDEX32
            | CapFlags::COMPUTE
            | CapFlags::FRAGMENT_DEPTH
            | CapFlags::TEXTURE_COMPARE_LEQUAL
            | CapFlags::VERTEX_ATTRIB_HALF,
        emulated: CapFlags::empty(),
        max_texture_size: 16384,
        max_views: MAX_VIEWS as u16,
        max_draw_calls: settings.limits.max_draw_calls,
        max_texture_stages: 16,
        max_fb_attachments: 8,
        formats,
    }
}

/// Headless backend: accepts every command and frame, renders nothing.
#[derive(Debug, Default)]
pub struct NullBackend {
    uploaded: usize,
    frames: u32,
    last_draws: usize,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploaded_bytes(&self) -> usize {
        self.uploaded
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn last_draws(&self) -> usize {
        self.last_draws
    }
}

impl RendererBackend for NullBackend {
    fn renderer_type(&self) -> RendererType {
        RendererType::Null
    }

    fn init(&mut self, settings: &InitSettings, platform: &PlatformData) -> Result<Caps> {
        if !platform.is_headless() {
            tracing::debug!("null backend ignores the platform window");
        }
        Ok(probe_capabilities(RendererType::Null, settings))
    }

    fn reset(&mut self, width: u32, height: u32, flags: ResetFlags) -> Result<()> {
        tracing::trace!("null reset {}x{} {:?}", width, height, flags);
        Ok(())
    }

    fn execute(&mut self, command: ResourceCommand<'_>) -> Result<()> {
        self.uploaded += command.upload_size();
        Ok(())
    }

    fn submit(&mut self, frame: &FrameData<'_>) -> Result<()> {
        self.frames += 1;
        self.last_draws = frame.draws.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_caps() {
        let settings = InitSettings::default();
        let caps = NullBackend::new().init(&settings, &PlatformData::default()).unwrap();
        assert_eq!(caps.renderer_type, RendererType::Null);
        assert!(caps.supports(CapFlags::INSTANCING | CapFlags::INDEX32));
        assert!(!caps.supports(CapFlags::SWAP_CHAIN));
        assert_eq!(caps.max_views, 256);
        assert_eq!(caps.max_draw_calls, 65535);
        assert!(caps.is_format_usable(TextureFormat::BC3));
        assert!(caps.is_format_usable(TextureFormat::D24S8));
        assert!(!caps.is_format_usable(TextureFormat::Unknown));
        assert!(!caps.is_format_usable(TextureFormat::UnknownDepth));
    }

    #[test]
    fn counts_uploads() {
        let mut backend = NullBackend::new();
        backend
            .execute(ResourceCommand::CreateShader {
                handle: ShaderHandle::from_bits(0),
                stage: ShaderStage::Vertex,
                data: b"VSH\x01abcd",
            })
            .unwrap();
        backend
            .execute(ResourceCommand::DestroyShader(ShaderHandle::from_bits(0)))
            .unwrap();
        assert_eq!(backend.uploaded_bytes(), 8);
    }
}
