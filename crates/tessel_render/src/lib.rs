//! Tessel Render
//!
//! Render command recorder: resources are created against a registry, views
//! are configured once and persist, and each frame is a list of draws
//! submitted from a single accumulator. A [`RendererBackend`] consumes the
//! finished frame; [`NullBackend`] does so without a GPU.
//!
//! ```ignore
//! let mut renderer = Renderer::init(InitSettings::default(), PlatformData::default())?;
//! renderer.set_view_clear(ViewId(0), ClearFlags::COLOR | ClearFlags::DEPTH, 0x303030ff, 1.0, 0);
//! renderer.set_view_rect(ViewId(0), 0, 0, 1280, 720);
//! loop {
//!     renderer.set_transform(&mtx);
//!     renderer.set_vertex_buffer(vb, 0, u32::MAX)?;
//!     renderer.set_index_buffer(ib, 0, u32::MAX)?;
//!     renderer.set_program(program)?;
//!     renderer.set_state(State::DEFAULT, 0);
//!     renderer.submit(ViewId(0), 0)?;
//!     renderer.frame()?;
//! }
//! ```

pub mod backend;
pub mod caps;
pub mod debug;
pub mod draw;
pub mod error;
pub mod frame;
pub mod registry;
pub mod renderer;
pub mod resource;
pub mod settings;
pub mod state;
pub mod texture;
pub mod transient;
pub mod vertex;
pub mod view;

pub use backend::{NullBackend, RendererBackend, ResourceCommand};
pub use caps::{CapFlags, Caps, FormatSupport};
pub use debug::{text_attr, DebugFlags, TextBuffer};
pub use error::{RenderError, Result};
pub use frame::{FrameData, Stats};
pub use renderer::Renderer;
pub use resource::{
    FrameBufferHandle, IndexBufferHandle, ProgramHandle, ShaderHandle, ShaderStage,
    TextureHandle, UniformHandle, UniformType, VertexBufferHandle,
};
pub use settings::{InitSettings, PlatformData, ResetFlags};
pub use state::State;
pub use texture::{TextureFlags, TextureFormat, TextureInfo};
pub use transient::{InstanceDataBuffer, TransientIndexBuffer, TransientVertexBuffer};
pub use vertex::{
    checked_decl, vertex_convert, vertex_pack, vertex_unpack, Attrib, AttribType, Vertex,
    VertexDecl,
};
pub use view::{BackbufferRatio, ClearFlags, Rect, View, ViewId};

pub use glam;
pub use tessel_core::{HandleError, RendererType};
