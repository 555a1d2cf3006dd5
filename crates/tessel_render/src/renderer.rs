//! The recorder
//!
//! `Renderer` owns the registry, the view table, the transient rings and the
//! single pending draw. Every mutating call takes `&mut self`, so there is
//! exactly one accumulator and it is only touched from the owning thread.

use crate::backend::{NullBackend, RendererBackend, ResourceCommand};
use crate::caps::{CapFlags, Caps};
use crate::debug::{DebugFlags, TextBuffer};
use crate::draw::{
    DrawState, IndexSource, RenderDraw, StencilState, TextureBinding, TransformRange,
    UniformBuffer, VertexSource,
};
use crate::error::{RenderError, Result};
use crate::frame::{FrameData, Stats};
use crate::registry::{IndexBufferRecord, ResourceRegistry, VertexBufferRecord};
use crate::resource::{
    FrameBufferHandle, IndexBufferHandle, ProgramHandle, ShaderHandle, ShaderStage,
    TextureHandle, UniformHandle, UniformType, VertexBufferHandle,
};
use crate::settings::{InitSettings, PlatformData, ResetFlags};
use crate::state::State;
use crate::texture::{calc_texture_size, TextureFlags, TextureFormat, TextureInfo};
use crate::transient::{
    InstanceDataBuffer, TransientBuffers, TransientIndexBuffer, TransientVertexBuffer,
};
use crate::vertex::{checked_decl, Vertex, VertexDecl};
use crate::view::{BackbufferRatio, ClearFlags, Rect, View, ViewClear, ViewId, ViewTable};
use glam::Mat4;
use std::fmt;
use tessel_core::RendererType;
use tessel_metrics::{FrameCounters, FrameTimer};
use tracing::{debug, info, trace, warn};

pub struct Renderer {
    backend: Box<dyn RendererBackend>,
    caps: Caps,
    settings: InitSettings,
    width: u32,
    height: u32,
    reset: ResetFlags,
    debug: DebugFlags,

    registry: ResourceRegistry,
    transient: TransientBuffers,
    views: ViewTable,

    draw: DrawState,
    uniform_mark: usize,
    uniforms: UniformBuffer,
    transforms: Vec<Mat4>,
    draws: Vec<RenderDraw>,

    text: TextBuffer,
    frame: u32,
    stats: Stats,
    timer: FrameTimer,
    counters: FrameCounters,
}

impl Renderer {
    /// Initialize with the backend named in `settings.renderer`.
    pub fn init(settings: InitSettings, platform: PlatformData) -> Result<Self> {
        let backend: Box<dyn RendererBackend> = match settings.renderer {
            RendererType::Null => Box::new(NullBackend::new()),
            _ => return Err(RenderError::Unsupported("hardware backends without Renderer::with_backend")),
        };
        Self::with_backend(settings, platform, backend)
    }

    pub fn with_backend(
        settings: InitSettings,
        platform: PlatformData,
        mut backend: Box<dyn RendererBackend>,
    ) -> Result<Self> {
        let caps = backend.init(&settings, &platform)?;
        let limits = &settings.limits;
        let (width, height) = (settings.resolution.width, settings.resolution.height);
        backend.reset(width, height, settings.resolution.reset)?;

        info!(
            "Renderer initialized: {} {}x{} ({} draw calls, {} KiB transient vertices, {} KiB transient indices)",
            caps.renderer_type.name(),
            width,
            height,
            caps.max_draw_calls.min(limits.max_draw_calls),
            limits.transient_vb_size / 1024,
            limits.transient_ib_size / 1024,
        );

        Ok(Self {
            registry: ResourceRegistry::new(limits.max_handles),
            transient: TransientBuffers::new(
                limits.transient_vb_size,
                limits.transient_ib_size,
                limits.instance_buffer_size,
            ),
            uniforms: UniformBuffer::new(limits.max_uniform_floats as usize),
            views: ViewTable::new(),
            draw: DrawState::default(),
            uniform_mark: 0,
            transforms: Vec::new(),
            draws: Vec::new(),
            text: TextBuffer::new(width, height),
            frame: 0,
            stats: Stats::default(),
            timer: FrameTimer::new(60),
            counters: FrameCounters::new(),
            width,
            height,
            reset: settings.resolution.reset,
            debug: settings.debug,
            backend,
            caps,
            settings,
        })
    }

    pub fn caps(&self) -> &Caps {
        &self.caps
    }

    pub fn renderer_type(&self) -> RendererType {
        self.caps.renderer_type
    }

    pub fn settings(&self) -> &InitSettings {
        &self.settings
    }

    pub fn backbuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number the next call to [`Renderer::frame`] will return.
    pub fn frame_number(&self) -> u32 {
        self.frame
    }

    fn max_draw_calls(&self) -> u32 {
        self.caps.max_draw_calls.min(self.settings.limits.max_draw_calls)
    }

    // ========================================================================
    // Resources
    // ========================================================================

    pub fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        decl: &VertexDecl,
    ) -> Result<VertexBufferHandle> {
        decl.expect_ended("create_vertex_buffer")?;
        if data.is_empty() {
            return Err(RenderError::EmptyData {
                what: "vertex buffer",
            });
        }
        let stride = decl.stride() as usize;
        if stride == 0 || data.len() % stride != 0 {
            return Err(RenderError::DataSize {
                what: "vertex buffer",
                expected: data.len() - data.len() % stride.max(1),
                actual: data.len(),
            });
        }

        let handle = self.registry.add_vertex_buffer(VertexBufferRecord {
            size: data.len() as u32,
            stride: decl.stride(),
        })?;
        self.backend
            .execute(ResourceCommand::CreateVertexBuffer { handle, data, decl })?;
        debug!("Created {:?}: {} vertices", handle, data.len() / stride);
        Ok(handle)
    }

    /// Create a vertex buffer from typed vertices.
    pub fn create_vertex_buffer_from<V: Vertex>(
        &mut self,
        vertices: &[V],
    ) -> Result<VertexBufferHandle> {
        let decl = checked_decl::<V>()?;
        self.create_vertex_buffer(bytemuck::cast_slice(vertices), &decl)
    }

    pub fn destroy_vertex_buffer(&mut self, handle: VertexBufferHandle) -> Result<()> {
        self.registry.remove_vertex_buffer(handle)?;
        self.backend
            .execute(ResourceCommand::DestroyVertexBuffer(handle))?;
        debug!("Destroyed {:?}", handle);
        Ok(())
    }

    pub fn create_index_buffer(&mut self, indices: &[u16]) -> Result<IndexBufferHandle> {
        self.add_index_buffer(bytemuck::cast_slice(indices), false)
    }

    pub fn create_index_buffer32(&mut self, indices: &[u32]) -> Result<IndexBufferHandle> {
        if !self.caps.supports(CapFlags::INDEX32) {
            return Err(RenderError::Unsupported("32-bit index buffers"));
        }
        self.add_index_buffer(bytemuck::cast_slice(indices), true)
    }

    fn add_index_buffer(&mut self, data: &[u8], index32: bool) -> Result<IndexBufferHandle> {
        if data.is_empty() {
            return Err(RenderError::EmptyData {
                what: "index buffer",
            });
        }
        let handle = self.registry.add_index_buffer(IndexBufferRecord {
            size: data.len() as u32,
            index32,
        })?;
        self.backend.execute(ResourceCommand::CreateIndexBuffer {
            handle,
            data,
            index32,
        })?;
        debug!("Created {:?}: {} bytes", handle, data.len());
        Ok(handle)
    }

    pub fn destroy_index_buffer(&mut self, handle: IndexBufferHandle) -> Result<()> {
        self.registry.remove_index_buffer(handle)?;
        self.backend.execute(ResourceCommand::DestroyIndexBuffer(handle))?;
        debug!("Destroyed {:?}", handle);
        Ok(())
    }

    /// Register compiled shader bytecode. The stage is read from the
    /// binary's magic.
    pub fn create_shader(&mut self, data: &[u8]) -> Result<ShaderHandle> {
        if data.is_empty() {
            return Err(RenderError::EmptyData { what: "shader" });
        }
        let stage = ShaderStage::from_magic(data);
        let handle = self.registry.add_shader(stage, data.len() as u32)?;
        self.backend.execute(ResourceCommand::CreateShader {
            handle,
            stage,
            data,
        })?;
        debug!("Created {:?} ({:?}, {} bytes)", handle, stage, data.len());
        Ok(handle)
    }

    /// Release the caller's reference. Programs linked against the shader
    /// keep it alive until they are destroyed.
    pub fn destroy_shader(&mut self, handle: ShaderHandle) -> Result<()> {
        if self.registry.release_shader(handle)? {
            self.backend.execute(ResourceCommand::DestroyShader(handle))?;
            debug!("Destroyed {:?}", handle);
        }
        Ok(())
    }

    /// Link a program. With `destroy_shaders` the caller's references to
    /// both shaders are released once the program holds them.
    pub fn create_program(
        &mut self,
        vs: ShaderHandle,
        fs: ShaderHandle,
        destroy_shaders: bool,
    ) -> Result<ProgramHandle> {
        let vs_stage = self.registry.shader(vs)?.stage;
        let fs_stage = self.registry.shader(fs)?.stage;
        if matches!(vs_stage, ShaderStage::Fragment | ShaderStage::Compute)
            || matches!(fs_stage, ShaderStage::Vertex | ShaderStage::Compute)
        {
            warn!(
                "Linking program from {:?} and {:?} shaders",
                vs_stage, fs_stage
            );
        }

        let handle = self.registry.add_program(vs, fs)?;
        self.backend
            .execute(ResourceCommand::CreateProgram { handle, vs, fs })?;
        debug!("Created {:?} from {:?} + {:?}", handle, vs, fs);

        if destroy_shaders {
            self.destroy_shader(vs)?;
            if fs != vs {
                self.destroy_shader(fs)?;
            }
        }
        Ok(handle)
    }

    pub fn destroy_program(&mut self, handle: ProgramHandle) -> Result<()> {
        let release = self.registry.remove_program(handle)?;
        self.backend.execute(ResourceCommand::DestroyProgram(handle))?;
        for shader in release.shaders {
            self.backend.execute(ResourceCommand::DestroyShader(shader))?;
        }
        debug!("Destroyed {:?}", handle);
        Ok(())
    }

    fn validate_texture(&self, width: u16, height: u16, format: TextureFormat) -> Result<()> {
        if format.is_marker() || !self.caps.is_format_usable(format) {
            return Err(RenderError::UnsupportedFormat(format));
        }
        let max = self.caps.max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::TextureSize { width, height, max });
        }
        Ok(())
    }

    /// Create a 2D texture. `data`, when given, must hold every mip level
    /// and match the computed storage size exactly.
    pub fn create_texture_2d(
        &mut self,
        width: u16,
        height: u16,
        num_mips: u8,
        format: TextureFormat,
        flags: TextureFlags,
        data: Option<&[u8]>,
    ) -> Result<(TextureHandle, TextureInfo)> {
        self.validate_texture(width, height, format)?;
        let info = calc_texture_size(width, height, 1, false, num_mips, format);
        if let Some(data) = data {
            if data.is_empty() {
                return Err(RenderError::EmptyData { what: "texture" });
            }
            if data.len() as u64 != info.storage_size {
                return Err(RenderError::DataSize {
                    what: "texture",
                    expected: usize::try_from(info.storage_size).unwrap_or(usize::MAX),
                    actual: data.len(),
                });
            }
        }

        let handle = self.registry.add_texture(info, flags)?;
        self.backend.execute(ResourceCommand::CreateTexture {
            handle,
            info,
            flags,
            data,
        })?;
        debug!(
            "Created {:?}: {}x{} {:?}, {} mips, {} bytes",
            handle, width, height, format, info.num_mips, info.storage_size
        );
        Ok((handle, info))
    }

    pub fn destroy_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let record = self.registry.remove_texture(handle)?;
        if let Some(owner) = record.owner {
            warn!("Destroyed {:?} while {:?} still renders to it", handle, owner);
        }
        self.backend.execute(ResourceCommand::DestroyTexture(handle))?;
        debug!("Destroyed {:?}", handle);
        Ok(())
    }

    /// Frame buffer with a single render target texture it owns.
    pub fn create_frame_buffer(
        &mut self,
        width: u16,
        height: u16,
        format: TextureFormat,
        flags: TextureFlags,
    ) -> Result<FrameBufferHandle> {
        let flags = flags | TextureFlags::RT;
        let (texture, _) = self.create_texture_2d(width, height, 1, format, flags, None)?;
        match self.create_frame_buffer_from_textures(&[texture], true) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.destroy_texture(texture)?;
                Err(err)
            }
        }
    }

    /// Frame buffer over existing textures. With `destroy_textures` they are
    /// destroyed together with the frame buffer.
    pub fn create_frame_buffer_from_textures(
        &mut self,
        attachments: &[TextureHandle],
        destroy_textures: bool,
    ) -> Result<FrameBufferHandle> {
        let max = self.caps.max_fb_attachments as usize;
        if attachments.len() > max {
            return Err(RenderError::Attachment {
                attachment: attachments.len() as u8,
                count: max,
            });
        }
        let handle = self.registry.add_frame_buffer(attachments, destroy_textures)?;
        self.backend.execute(ResourceCommand::CreateFrameBuffer {
            handle,
            attachments,
        })?;
        debug!("Created {:?} with {} attachments", handle, attachments.len());
        Ok(handle)
    }

    pub fn destroy_frame_buffer(&mut self, handle: FrameBufferHandle) -> Result<()> {
        let release = self.registry.remove_frame_buffer(handle)?;
        self.backend.execute(ResourceCommand::DestroyFrameBuffer(handle))?;
        for texture in release.textures {
            self.backend.execute(ResourceCommand::DestroyTexture(texture))?;
        }
        let detached = self.views.detach_frame_buffer(handle);
        if detached > 0 {
            debug!("{:?} detached from {} views", handle, detached);
        }
        debug!("Destroyed {:?}", handle);
        Ok(())
    }

    /// Register a uniform by name. Registering a name again returns the
    /// same handle; each registration needs a matching destroy.
    pub fn create_uniform(&mut self, name: &str, ty: UniformType, num: u16) -> Result<UniformHandle> {
        let (handle, created) = self.registry.add_uniform(name, ty, num)?;
        if created {
            let num = self.registry.uniform(handle)?.num;
            self.backend.execute(ResourceCommand::CreateUniform {
                handle,
                name,
                ty,
                num,
            })?;
            debug!("Created {:?} `{}` ({:?}x{})", handle, name, ty, num);
        }
        Ok(handle)
    }

    pub fn destroy_uniform(&mut self, handle: UniformHandle) -> Result<()> {
        if self.registry.release_uniform(handle)? {
            self.backend.execute(ResourceCommand::DestroyUniform(handle))?;
            debug!("Destroyed {:?}", handle);
        }
        Ok(())
    }

    // ========================================================================
    // Transient buffers
    // ========================================================================

    pub fn alloc_transient_vertex_buffer(
        &mut self,
        num: u32,
        decl: &VertexDecl,
    ) -> Result<TransientVertexBuffer> {
        self.transient.alloc_vertices(num, decl)
    }

    pub fn alloc_transient_index_buffer(&mut self, num: u32) -> Result<TransientIndexBuffer> {
        self.transient.alloc_indices(num)
    }

    /// Allocate vertices and indices together. `None` when either does not
    /// fit in what is left of this frame; nothing is consumed and the draw
    /// should be skipped.
    pub fn alloc_transient_buffers(
        &mut self,
        decl: &VertexDecl,
        num_vertices: u32,
        num_indices: u32,
    ) -> Option<(TransientVertexBuffer, TransientIndexBuffer)> {
        let buffers = self.transient.alloc_both(decl, num_vertices, num_indices);
        if buffers.is_none() {
            warn!(
                "Transient buffers exhausted in frame {} ({} vertices, {} indices requested)",
                self.frame, num_vertices, num_indices
            );
        }
        buffers
    }

    /// How many of `num` vertices still fit this frame.
    pub fn available_transient_vertex_buffer(&self, num: u32, decl: &VertexDecl) -> u32 {
        self.transient.available_vertices(num, decl)
    }

    pub fn available_transient_index_buffer(&self, num: u32) -> u32 {
        self.transient.available_indices(num)
    }

    /// Instance records for this frame. `stride` must be a multiple of 16;
    /// `num` is clamped to what is left of the instance ring.
    pub fn alloc_instance_data_buffer(&mut self, num: u32, stride: u16) -> Result<InstanceDataBuffer> {
        if !self.caps.supports(CapFlags::INSTANCING) {
            return Err(RenderError::Unsupported("instancing"));
        }
        self.transient.alloc_instances(num, stride)
    }

    pub fn transient_vertex_bytes_mut(&mut self, tvb: &TransientVertexBuffer) -> Result<&mut [u8]> {
        self.transient.vertex_bytes_mut(tvb)
    }

    /// Typed view over a transient vertex region.
    pub fn transient_vertices_mut<V: Vertex>(
        &mut self,
        tvb: &TransientVertexBuffer,
    ) -> Result<&mut [V]> {
        let actual = std::mem::size_of::<V>();
        if actual != tvb.stride() as usize {
            return Err(RenderError::StrideMismatch {
                expected: tvb.stride() as usize,
                actual,
            });
        }
        let bytes = self.transient.vertex_bytes_mut(tvb)?;
        bytemuck::try_cast_slice_mut(bytes).map_err(|_| RenderError::Misaligned {
            align: std::mem::align_of::<V>(),
        })
    }

    pub fn transient_indices_mut(&mut self, tib: &TransientIndexBuffer) -> Result<&mut [u16]> {
        self.transient.indices_mut(tib)
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn view(&self, id: ViewId) -> &View {
        self.views.get(id)
    }

    pub fn set_view_name(&mut self, id: ViewId, name: &str) {
        self.views.set_name(id, name);
    }

    pub fn set_view_rect(&mut self, id: ViewId, x: u16, y: u16, width: u16, height: u16) {
        self.views.set_rect(id, Rect::new(x, y, width, height));
    }

    /// Size the view from the backbuffer; it follows later resets.
    pub fn set_view_rect_auto(&mut self, id: ViewId, x: u16, y: u16, ratio: BackbufferRatio) {
        self.views
            .set_rect_auto(id, x, y, ratio, (self.width, self.height));
    }

    pub fn set_view_scissor(&mut self, id: ViewId, x: u16, y: u16, width: u16, height: u16) {
        self.views.set_scissor(id, Rect::new(x, y, width, height));
    }

    pub fn set_view_clear(&mut self, id: ViewId, flags: ClearFlags, rgba: u32, depth: f32, stencil: u8) {
        self.views.set_clear(
            id,
            ViewClear {
                flags,
                rgba,
                depth,
                stencil,
            },
        );
    }

    pub fn set_view_transform(&mut self, id: ViewId, view: &Mat4, proj: &Mat4) {
        self.views.set_transform(id, *view, *proj);
    }

    /// Render the view into `fb`, or into the backbuffer with `None`.
    pub fn set_view_frame_buffer(&mut self, id: ViewId, fb: Option<FrameBufferHandle>) -> Result<()> {
        if let Some(fb) = fb {
            self.registry.frame_buffer(fb)?;
        }
        self.views.set_frame_buffer(id, fb);
        Ok(())
    }

    pub fn reset_view(&mut self, id: ViewId) {
        self.views.reset(id);
    }

    // ========================================================================
    // Draw state
    // ========================================================================

    /// Cache a model matrix for the pending draw. Returns its index in this
    /// frame's transform cache.
    pub fn set_transform(&mut self, mtx: &Mat4) -> u32 {
        let first = self.transforms.len() as u32;
        self.transforms.push(*mtx);
        self.draw.transform = Some(TransformRange { first, num: 1 });
        first
    }

    /// Cache several matrices (skinning palettes and the like).
    pub fn set_transforms(&mut self, mtx: &[Mat4]) -> Result<u32> {
        if mtx.is_empty() {
            return Err(RenderError::EmptyData { what: "transforms" });
        }
        let num = u16::try_from(mtx.len()).map_err(|_| RenderError::DataSize {
            what: "transforms",
            expected: u16::MAX as usize,
            actual: mtx.len(),
        })?;
        let first = self.transforms.len() as u32;
        self.transforms.extend_from_slice(mtx);
        self.draw.transform = Some(TransformRange { first, num });
        Ok(first)
    }

    /// Reuse matrices cached earlier this frame.
    pub fn set_transform_cached(&mut self, first: u32, num: u16) -> Result<()> {
        let end = first as usize + num as usize;
        if num == 0 || end > self.transforms.len() {
            return Err(RenderError::DataSize {
                what: "transform cache",
                expected: self.transforms.len(),
                actual: end,
            });
        }
        self.draw.transform = Some(TransformRange { first, num });
        Ok(())
    }

    pub fn set_program(&mut self, program: ProgramHandle) -> Result<()> {
        self.registry.program(program)?;
        self.draw.program = Some(program);
        Ok(())
    }

    /// Bind `num` vertices starting at `start`; `u32::MAX` binds the rest
    /// of the buffer.
    pub fn set_vertex_buffer(&mut self, handle: VertexBufferHandle, start: u32, num: u32) -> Result<()> {
        let total = self.registry.vertex_buffer(handle)?.num_vertices();
        let start = start.min(total);
        self.draw.vertex = Some(VertexSource::Static {
            handle,
            start,
            num: num.min(total - start),
        });
        Ok(())
    }

    pub fn set_transient_vertex_buffer(&mut self, tvb: &TransientVertexBuffer) -> Result<()> {
        self.transient.check_vertices(tvb)?;
        self.draw.vertex = Some(VertexSource::Transient {
            base_vertex: tvb.base_vertex(),
            num: tvb.num_vertices(),
            stride: tvb.stride(),
        });
        Ok(())
    }

    /// Bind `num` indices starting at `first`; `u32::MAX` binds the rest of
    /// the buffer.
    pub fn set_index_buffer(&mut self, handle: IndexBufferHandle, first: u32, num: u32) -> Result<()> {
        let record = self.registry.index_buffer(handle)?;
        let total = record.num_indices();
        let first = first.min(total);
        self.draw.index = Some(IndexSource::Static {
            handle,
            first,
            num: num.min(total - first),
            index32: record.index32,
        });
        Ok(())
    }

    pub fn set_transient_index_buffer(&mut self, tib: &TransientIndexBuffer) -> Result<()> {
        self.transient.check_indices(tib)?;
        self.draw.index = Some(IndexSource::Transient {
            first: tib.first_index(),
            num: tib.num_indices(),
        });
        Ok(())
    }

    /// Instance the pending draw over the first `num` records of `idb`.
    pub fn set_instance_data_buffer(&mut self, idb: &InstanceDataBuffer, num: u32) -> Result<()> {
        let binding = self.transient.commit_instances(idb, num)?;
        self.draw.instances = Some(binding);
        Ok(())
    }

    /// Set uniform values for the pending draw. `values` may cover fewer
    /// elements than the uniform holds.
    pub fn set_uniform(&mut self, handle: UniformHandle, values: &[f32]) -> Result<()> {
        let record = self.registry.uniform(handle)?;
        if values.is_empty() {
            return Err(RenderError::EmptyData { what: "uniform" });
        }
        if values.len() > record.capacity() {
            return Err(RenderError::UniformSize {
                name: record.name.clone(),
                capacity: record.capacity(),
                actual: values.len(),
            });
        }
        self.uniforms.push(handle, values)
    }

    fn check_stage(&self, stage: u8) -> Result<()> {
        let max = self.caps.max_texture_stages;
        if stage >= max {
            return Err(RenderError::TextureStage {
                stage,
                max: max.saturating_sub(1),
            });
        }
        Ok(())
    }

    /// Bind a texture to `stage`. `flags` of `None` keeps the texture's
    /// own sampler flags.
    pub fn set_texture(
        &mut self,
        stage: u8,
        sampler: UniformHandle,
        texture: TextureHandle,
        flags: Option<TextureFlags>,
    ) -> Result<()> {
        self.check_stage(stage)?;
        self.registry.uniform(sampler)?;
        self.registry.texture(texture)?;
        self.draw.set_texture(
            stage,
            TextureBinding {
                sampler,
                texture,
                flags,
            },
        )
    }

    /// Bind one attachment of a frame buffer as a texture.
    pub fn set_texture_from_frame_buffer(
        &mut self,
        stage: u8,
        sampler: UniformHandle,
        fb: FrameBufferHandle,
        attachment: u8,
        flags: Option<TextureFlags>,
    ) -> Result<()> {
        let texture = self.registry.frame_buffer_texture(fb, attachment)?;
        self.set_texture(stage, sampler, texture, flags)
    }

    /// Render state for the pending draw. `rgba` is the constant blend
    /// color used by `BLEND_FACTOR`.
    pub fn set_state(&mut self, state: State, rgba: u32) {
        self.draw.state = state;
        self.draw.blend_factor = rgba;
    }

    pub fn set_scissor(&mut self, x: u16, y: u16, width: u16, height: u16) {
        self.draw.scissor = Some(Rect::new(x, y, width, height));
    }

    pub fn set_stencil(&mut self, front: u32, back: u32) {
        self.draw.stencil = StencilState { front, back };
    }

    // ========================================================================
    // Submission
    // ========================================================================

    fn push_draw(&mut self, view: ViewId, depth: u32, draw: DrawState) -> Result<u32> {
        let limit = self.max_draw_calls();
        if self.draws.len() as u32 >= limit {
            self.uniforms.truncate(self.uniform_mark);
            return Err(RenderError::DrawCallLimit(limit));
        }
        let sequence = self.draws.len() as u32;
        let uniforms = self.uniform_mark..self.uniforms.mark();
        self.uniform_mark = uniforms.end;
        self.draws.push(RenderDraw {
            view,
            depth,
            sequence,
            draw,
            uniforms,
        });
        Ok(sequence)
    }

    /// Record the pending draw into `view` and reset the accumulator.
    /// Returns the draw's index within the frame.
    pub fn submit(&mut self, view: ViewId, depth: u32) -> Result<u32> {
        let draw = self.draw.take();
        let Some(program) = draw.program else {
            self.uniforms.truncate(self.uniform_mark);
            return Err(RenderError::NoProgram);
        };
        if let Err(err) = self.registry.program(program) {
            self.uniforms.truncate(self.uniform_mark);
            return Err(err);
        }
        let sequence = self.push_draw(view, depth, draw)?;
        trace!("submit #{} to view {} ({:?})", sequence, view.0, program);
        Ok(sequence)
    }

    /// Submit an empty draw so the view is cleared even with nothing drawn.
    ///
    /// Like `submit`, this consumes the pending state: transforms, uniforms
    /// and bindings set so far travel with the touch entry, and any program
    /// is ignored, so nothing is rasterized.
    pub fn touch(&mut self, view: ViewId) -> Result<u32> {
        let mut draw = self.draw.take();
        draw.program = None;
        self.push_draw(view, 0, draw)
    }

    /// Drop the pending draw without submitting it.
    pub fn discard(&mut self) {
        self.draw.take();
        self.uniforms.truncate(self.uniform_mark);
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Hand this frame's draws to the backend and start the next frame.
    /// Returns the number of the frame just submitted.
    pub fn frame(&mut self) -> Result<u32> {
        if self.draw != DrawState::default() {
            debug!("Pending draw discarded at end of frame {}", self.frame);
        }
        self.discard();
        self.draws.sort_by_key(RenderDraw::sort_key);

        let frame = self.frame;
        let data = FrameData {
            frame,
            width: self.width,
            height: self.height,
            reset: self.reset,
            debug: self.debug,
            views: &self.views,
            draws: &self.draws,
            uniforms: &self.uniforms,
            transforms: &self.transforms,
            transient_vertices: self.transient.vertex_data(),
            transient_indices: self.transient.index_data(),
            instance_data: self.transient.instance_data(),
            text: self.debug.contains(DebugFlags::TEXT).then_some(&self.text),
        };
        let submitted = self.backend.submit(&data);

        let mut stats = Stats {
            frame,
            width: self.width,
            height: self.height,
            uniform_floats: self.uniforms.len_floats(),
            transforms: self.transforms.len(),
            resources: self.registry.counts(),
            ..Stats::default()
        };
        stats.count_draws(&self.draws);

        let elapsed = self.timer.tick();
        stats.cpu_time_ms = elapsed.as_secs_f64() * 1000.0;
        stats.fps = self.timer.fps();
        self.counters.add("draws", stats.num_draws as u64);
        self.counters.add("primitives", stats.num_primitives);
        self.counters.end_frame();
        stats.total_draws = self.counters.total("draws");
        stats.total_primitives = self.counters.total("primitives");

        self.frame = frame.wrapping_add(1);
        stats.transient = self.transient.end_frame(self.frame);
        stats.transient_peak = self.transient.peaks();
        self.draws.clear();
        self.uniforms.clear();
        self.uniform_mark = 0;
        self.transforms.clear();

        trace!(
            "frame {}: {} draws, {} primitives",
            frame,
            stats.num_draws,
            stats.num_primitives
        );
        self.stats = stats;
        submitted?;
        Ok(frame)
    }

    /// Resize the backbuffer. Views sized with `set_view_rect_auto` follow.
    pub fn reset(&mut self, width: u32, height: u32, flags: ResetFlags) -> Result<()> {
        if (width, height, flags) == (self.width, self.height, self.reset) {
            debug!("Reset {}x{} unchanged", width, height);
            return Ok(());
        }
        self.backend.reset(width, height, flags)?;
        self.width = width;
        self.height = height;
        self.reset = flags;
        self.views.resize_auto((width, height));
        self.text.resize(width, height);
        info!("Backbuffer reset to {}x{} ({:?})", width, height, flags);
        Ok(())
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Tear down, reporting every resource that was never destroyed.
    pub fn shutdown(mut self) {
        let counts = self.registry.counts();
        if counts.total() > 0 {
            warn!(
                "Shutdown with {} live resources: {} vertex buffers, {} index buffers, {} shaders, {} programs, {} textures, {} frame buffers, {} uniforms",
                counts.total(),
                counts.vertex_buffers,
                counts.index_buffers,
                counts.shaders,
                counts.programs,
                counts.textures,
                counts.frame_buffers,
                counts.uniforms
            );
        }
        self.backend.shutdown();
        info!("Renderer shut down after {} frames", self.frame);
    }

    // ========================================================================
    // Debug
    // ========================================================================

    pub fn set_debug(&mut self, flags: DebugFlags) {
        self.debug = flags;
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.debug
    }

    /// Blank the debug text grid. `small` switches to 8x8 cells.
    pub fn dbg_text_clear(&mut self, attr: u8, small: bool) {
        self.text.clear(attr, small);
    }

    /// Print at cell (x, y). Prefer the [`crate::dbg_text!`] macro.
    pub fn dbg_text_print(&mut self, x: u16, y: u16, attr: u8, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(text) => self.text.print(x, y, attr, text),
            None => self.text.print(x, y, attr, &args.to_string()),
        }
    }

    pub fn text(&self) -> &TextBuffer {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbg_text;
    use crate::frame::FrameData;
    use crate::vertex::{Attrib, AttribType};
    use bytemuck::{Pod, Zeroable};
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;
    use tessel_core::HandleError;

    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    struct PosColorVertex {
        pos: [f32; 3],
        abgr: u32,
    }

    impl Vertex for PosColorVertex {
        fn decl() -> VertexDecl {
            let mut decl = VertexDecl::new();
            decl.begin()
                .add(Attrib::Position, 3, AttribType::Float, false, false)
                .unwrap()
                .add(Attrib::Color0, 4, AttribType::Uint8, true, false)
                .unwrap()
                .end()
                .unwrap();
            decl
        }
    }

    const CUBE: [PosColorVertex; 4] = [
        PosColorVertex { pos: [-1.0, 1.0, 1.0], abgr: 0xff00_0000 },
        PosColorVertex { pos: [1.0, 1.0, 1.0], abgr: 0xff00_00ff },
        PosColorVertex { pos: [-1.0, -1.0, 1.0], abgr: 0xff00_ff00 },
        PosColorVertex { pos: [1.0, -1.0, 1.0], abgr: 0xff00_ffff },
    ];

    /// What the backend saw, per frame.
    #[derive(Default)]
    struct Recorded {
        frames: Vec<(u32, Vec<(u8, u32)>)>,
        commands: Vec<String>,
        uniform_values: Vec<Vec<f32>>,
        text_row0: Option<String>,
    }

    struct RecordingBackend(Rc<RefCell<Recorded>>);

    impl RendererBackend for RecordingBackend {
        fn renderer_type(&self) -> RendererType {
            RendererType::Null
        }

        fn init(&mut self, settings: &InitSettings, _platform: &PlatformData) -> Result<Caps> {
            Ok(crate::backend::probe_capabilities(RendererType::Null, settings))
        }

        fn reset(&mut self, _width: u32, _height: u32, _flags: ResetFlags) -> Result<()> {
            Ok(())
        }

        fn execute(&mut self, command: ResourceCommand<'_>) -> Result<()> {
            let name = format!("{:?}", command);
            let name = name.split([' ', '(']).next().unwrap_or_default().to_string();
            self.0.borrow_mut().commands.push(name);
            Ok(())
        }

        fn submit(&mut self, frame: &FrameData<'_>) -> Result<()> {
            let mut recorded = self.0.borrow_mut();
            let draws = frame.draws.iter().map(|d| (d.view.0, d.sequence)).collect();
            recorded.frames.push((frame.frame, draws));
            for draw in frame.draws {
                for update in &frame.uniforms.updates()[draw.uniforms.clone()] {
                    recorded.uniform_values.push(frame.uniforms.values(update).to_vec());
                }
            }
            recorded.text_row0 = frame.text.map(|t| t.row_text(0));
            Ok(())
        }
    }

    fn settings() -> InitSettings {
        let mut settings = InitSettings::default();
        settings.limits.transient_vb_size = 16 * 64;
        settings.limits.transient_ib_size = 2 * 96;
        settings.limits.instance_buffer_size = 1024;
        settings.limits.max_draw_calls = 8;
        settings
    }

    fn recording() -> (Renderer, Rc<RefCell<Recorded>>) {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let backend = Box::new(RecordingBackend(recorded.clone()));
        let renderer = Renderer::with_backend(settings(), PlatformData::default(), backend).unwrap();
        (renderer, recorded)
    }

    fn program(renderer: &mut Renderer) -> ProgramHandle {
        let vs = renderer.create_shader(b"VSH\x01vs").unwrap();
        let fs = renderer.create_shader(b"FSH\x01fs").unwrap();
        renderer.create_program(vs, fs, true).unwrap()
    }

    #[test]
    fn init_reports_null_caps() {
        let renderer = Renderer::init(settings(), PlatformData::default()).unwrap();
        assert_eq!(renderer.renderer_type(), RendererType::Null);
        assert!(renderer.caps().supports(CapFlags::INSTANCING));
        assert_eq!(renderer.frame_number(), 0);
        assert_eq!(renderer.backbuffer_size(), (1280, 720));

        let mut vulkan = settings();
        vulkan.renderer = RendererType::Vulkan;
        assert!(matches!(
            Renderer::init(vulkan, PlatformData::default()),
            Err(RenderError::Unsupported(_))
        ));
    }

    #[test]
    fn submit_snapshots_and_resets() {
        let (mut renderer, recorded) = recording();
        let program = program(&mut renderer);
        let vb = renderer.create_vertex_buffer_from(&CUBE).unwrap();
        let ib = renderer.create_index_buffer(&[0, 1, 2, 1, 3, 2]).unwrap();

        renderer.set_transform(&Mat4::IDENTITY);
        renderer.set_vertex_buffer(vb, 0, u32::MAX).unwrap();
        renderer.set_index_buffer(ib, 0, u32::MAX).unwrap();
        renderer.set_program(program).unwrap();
        renderer.set_state(State::DEFAULT | State::blend_alpha(), 0);
        assert_eq!(renderer.submit(ViewId(0), 0).unwrap(), 0);

        // Accumulator is empty again
        assert!(matches!(renderer.submit(ViewId(0), 0), Err(RenderError::NoProgram)));

        assert_eq!(renderer.frame().unwrap(), 0);
        let stats = renderer.stats();
        assert_eq!(stats.num_draws, 1);
        assert_eq!(stats.num_primitives, 2);
        assert_eq!(stats.transforms, 1);
        assert_eq!(recorded.borrow().frames, vec![(0, vec![(0, 0)])]);
    }

    #[test]
    fn frame_sorts_by_view_then_submission() {
        let (mut renderer, recorded) = recording();
        let program = program(&mut renderer);
        for view in [3u8, 1, 3, 0] {
            renderer.set_program(program).unwrap();
            renderer.submit(ViewId(view), 0).unwrap();
        }
        renderer.touch(ViewId(2)).unwrap();

        assert_eq!(renderer.frame().unwrap(), 0);
        assert_eq!(renderer.frame().unwrap(), 1);
        let recorded = recorded.borrow();
        assert_eq!(
            recorded.frames[0].1,
            vec![(0, 3), (1, 1), (2, 4), (3, 0), (3, 2)]
        );
        assert!(recorded.frames[1].1.is_empty());
        assert_eq!(renderer.stats().num_draws, 0);
    }

    #[test]
    fn draw_call_limit_resets_accumulator() {
        let (mut renderer, _) = recording();
        let program = program(&mut renderer);
        for _ in 0..8 {
            renderer.set_program(program).unwrap();
            renderer.submit(ViewId(0), 0).unwrap();
        }
        renderer.set_program(program).unwrap();
        assert!(matches!(
            renderer.submit(ViewId(0), 0),
            Err(RenderError::DrawCallLimit(8))
        ));
        assert!(matches!(renderer.submit(ViewId(0), 0), Err(RenderError::NoProgram)));

        renderer.frame().unwrap();
        renderer.set_program(program).unwrap();
        assert_eq!(renderer.submit(ViewId(0), 0).unwrap(), 0);
    }

    #[test]
    fn uniforms_follow_their_draw() {
        let (mut renderer, recorded) = recording();
        let program = program(&mut renderer);
        let color = renderer.create_uniform("u_color", UniformType::Vec4, 1).unwrap();
        assert_eq!(renderer.create_uniform("u_color", UniformType::Vec4, 1).unwrap(), color);

        // Discarded values never reach the backend
        renderer.set_uniform(color, &[9.0; 4]).unwrap();
        renderer.discard();

        renderer.set_uniform(color, &[1.0, 0.0, 0.0, 1.0]).unwrap();
        renderer.set_program(program).unwrap();
        renderer.submit(ViewId(0), 0).unwrap();

        assert!(matches!(
            renderer.set_uniform(color, &[0.0; 5]),
            Err(RenderError::UniformSize { capacity: 4, actual: 5, .. })
        ));

        renderer.frame().unwrap();
        assert_eq!(recorded.borrow().uniform_values, vec![vec![1.0, 0.0, 0.0, 1.0]]);

        renderer.destroy_uniform(color).unwrap();
        renderer.destroy_uniform(color).unwrap();
        assert!(renderer.destroy_uniform(color).is_err());
    }

    #[test]
    fn stale_handles_are_errors() {
        let (mut renderer, _) = recording();
        let vb = renderer.create_vertex_buffer_from(&CUBE).unwrap();
        renderer.destroy_vertex_buffer(vb).unwrap();
        assert!(matches!(
            renderer.destroy_vertex_buffer(vb),
            Err(RenderError::Handle(HandleError::Stale { .. }))
        ));
        assert!(renderer.set_vertex_buffer(vb, 0, u32::MAX).is_err());

        let program = program(&mut renderer);
        renderer.set_program(program).unwrap();
        renderer.destroy_program(program).unwrap();
        assert!(matches!(
            renderer.submit(ViewId(0), 0),
            Err(RenderError::Handle(HandleError::Stale { .. }))
        ));
    }

    #[test]
    fn program_destroy_releases_shaders() {
        let (mut renderer, recorded) = recording();
        let program = program(&mut renderer);
        assert_eq!(renderer.registry.counts().shaders, 2);
        renderer.destroy_program(program).unwrap();
        assert_eq!(renderer.registry.counts().total(), 0);
        let commands = recorded.borrow().commands.clone();
        assert_eq!(
            commands,
            vec![
                "CreateShader",
                "CreateShader",
                "CreateProgram",
                "DestroyProgram",
                "DestroyShader",
                "DestroyShader"
            ]
        );
    }

    #[test]
    fn empty_data_is_rejected() {
        let (mut renderer, _) = recording();
        let decl = PosColorVertex::decl();
        assert!(matches!(
            renderer.create_vertex_buffer(&[], &decl),
            Err(RenderError::EmptyData { .. })
        ));
        assert!(matches!(
            renderer.create_vertex_buffer(&[0; 20], &decl),
            Err(RenderError::DataSize { expected: 16, actual: 20, .. })
        ));
        assert!(renderer.create_index_buffer(&[]).is_err());
        assert!(renderer.create_shader(&[]).is_err());
    }

    #[test]
    fn transient_buffers_soft_fail_and_go_stale() {
        let (mut renderer, _) = recording();
        let decl = PosColorVertex::decl();
        assert_eq!(renderer.available_transient_vertex_buffer(100, &decl), 64);

        let (tvb, tib) = renderer.alloc_transient_buffers(&decl, 4, 6).unwrap();
        renderer
            .transient_vertices_mut::<PosColorVertex>(&tvb)
            .unwrap()
            .copy_from_slice(&CUBE);
        renderer
            .transient_indices_mut(&tib)
            .unwrap()
            .copy_from_slice(&[0, 1, 2, 1, 3, 2]);

        // More than the rest of the ring: nothing consumed
        assert!(renderer.alloc_transient_buffers(&decl, 61, 6).is_none());
        assert_eq!(renderer.available_transient_vertex_buffer(100, &decl), 60);

        let program = program(&mut renderer);
        renderer.set_transient_vertex_buffer(&tvb).unwrap();
        renderer.set_transient_index_buffer(&tib).unwrap();
        renderer.set_program(program).unwrap();
        renderer.submit(ViewId(0), 0).unwrap();
        renderer.frame().unwrap();
        assert_eq!(renderer.stats().transient.vertex_bytes, 64);
        assert_eq!(renderer.stats().transient.index_bytes, 12);

        assert!(matches!(
            renderer.transient_vertex_bytes_mut(&tvb),
            Err(RenderError::StaleTransient { allocated: 0, current: 1 })
        ));
        assert!(renderer.set_transient_index_buffer(&tib).is_err());
        assert_eq!(renderer.available_transient_vertex_buffer(100, &decl), 64);
    }

    #[test]
    fn typed_transient_access_checks_stride() {
        #[repr(C)]
        #[derive(Clone, Copy, Pod, Zeroable)]
        struct Wide {
            pos: [f32; 4],
            uv: [f32; 2],
        }
        impl Vertex for Wide {
            fn decl() -> VertexDecl {
                VertexDecl::new()
            }
        }

        let (mut renderer, _) = recording();
        let tvb = renderer
            .alloc_transient_vertex_buffer(2, &PosColorVertex::decl())
            .unwrap();
        assert!(matches!(
            renderer.transient_vertices_mut::<Wide>(&tvb),
            Err(RenderError::StrideMismatch { expected: 16, actual: 24 })
        ));
    }

    #[test]
    fn instanced_draw() {
        let (mut renderer, _) = recording();
        let program = program(&mut renderer);
        let mut idb = renderer.alloc_instance_data_buffer(4, 80).unwrap();
        for i in 0..4 {
            let mtx = Mat4::from_translation(glam::Vec3::new(i as f32, 0.0, 0.0));
            idb.write_all(bytemuck::bytes_of(&mtx)).unwrap();
            idb.write_all(bytemuck::bytes_of(&[1.0f32, 0.5, 0.25, 1.0])).unwrap();
        }
        assert_eq!(idb.remaining(), 0);

        let vb = renderer.create_vertex_buffer_from(&CUBE).unwrap();
        renderer.set_vertex_buffer(vb, 0, u32::MAX).unwrap();
        renderer.set_instance_data_buffer(&idb, 3).unwrap();
        renderer.set_program(program).unwrap();
        renderer.submit(ViewId(0), 0).unwrap();
        renderer.frame().unwrap();
        assert_eq!(renderer.stats().num_instances, 3);
        assert_eq!(renderer.stats().transient.instance_bytes, 320);

        assert!(renderer.set_instance_data_buffer(&idb, 1).is_err());
        assert!(matches!(
            renderer.alloc_instance_data_buffer(1, 72),
            Err(RenderError::InstanceStride(72))
        ));
    }

    #[test]
    fn textures_and_frame_buffers() {
        let (mut renderer, _) = recording();
        let sampler = renderer.create_uniform("s_tex", UniformType::Int1, 1).unwrap();

        let (texture, info) = renderer
            .create_texture_2d(256, 256, 16, TextureFormat::BGRA8, TextureFlags::empty(), None)
            .unwrap();
        assert_eq!(info.num_mips, 9);
        renderer.set_texture(0, sampler, texture, None).unwrap();
        assert!(matches!(
            renderer.set_texture(16, sampler, texture, None),
            Err(RenderError::TextureStage { stage: 16, max: 15 })
        ));
        assert!(matches!(
            renderer.create_texture_2d(4, 4, 1, TextureFormat::Unknown, TextureFlags::empty(), None),
            Err(RenderError::UnsupportedFormat(TextureFormat::Unknown))
        ));
        assert!(matches!(
            renderer.create_texture_2d(4, 4, 1, TextureFormat::BGRA8, TextureFlags::empty(), Some(&[0; 3])),
            Err(RenderError::DataSize { expected: 64, actual: 3, .. })
        ));

        let fb = renderer
            .create_frame_buffer(320, 240, TextureFormat::BGRA8, TextureFlags::empty())
            .unwrap();
        renderer.set_view_frame_buffer(ViewId(1), Some(fb)).unwrap();
        renderer
            .set_texture_from_frame_buffer(1, sampler, fb, 0, None)
            .unwrap();
        assert!(renderer
            .set_texture_from_frame_buffer(1, sampler, fb, 1, None)
            .is_err());

        renderer.destroy_frame_buffer(fb).unwrap();
        assert!(renderer.view(ViewId(1)).frame_buffer.is_none());
        assert!(renderer.set_view_frame_buffer(ViewId(1), Some(fb)).is_err());
        assert_eq!(renderer.registry.counts().textures, 1);
    }

    #[test]
    fn reset_resizes_auto_views() {
        let (mut renderer, _) = recording();
        renderer.set_view_rect_auto(ViewId(0), 0, 0, BackbufferRatio::Equal);
        renderer.set_view_rect(ViewId(1), 0, 0, 100, 100);
        renderer.reset(1920, 1080, ResetFlags::VSYNC).unwrap();
        renderer.reset(1920, 1080, ResetFlags::VSYNC).unwrap();
        assert_eq!(renderer.view(ViewId(0)).rect, Rect::new(0, 0, 1920, 1080));
        assert_eq!(renderer.view(ViewId(1)).rect, Rect::new(0, 0, 100, 100));
        assert_eq!(renderer.text().columns(), 240);
    }

    #[test]
    fn debug_text_reaches_backend_when_enabled() {
        let (mut renderer, recorded) = recording();
        renderer.dbg_text_clear(0, false);
        let frame = renderer.frame_number();
        dbg_text!(renderer, 0, 0, 0x4f, "frame {}", frame);
        renderer.frame().unwrap();
        assert_eq!(recorded.borrow().text_row0, None);

        renderer.set_debug(DebugFlags::TEXT);
        renderer.frame().unwrap();
        assert_eq!(recorded.borrow().text_row0.as_deref(), Some("frame 0"));
    }

    #[test]
    fn index32_needs_caps() {
        let (mut renderer, _) = recording();
        assert!(renderer.create_index_buffer32(&[0, 1, 2]).is_ok());
        renderer.caps.supported.remove(CapFlags::INDEX32);
        assert!(matches!(
            renderer.create_index_buffer32(&[0, 1, 2]),
            Err(RenderError::Unsupported(_))
        ));
    }

    #[test]
    fn empty_transient_allocs_at_ring_end() {
        let (mut renderer, _) = recording();
        let decl = PosColorVertex::decl();
        let mut position_only = VertexDecl::new();
        position_only
            .begin()
            .add(Attrib::Position, 3, AttribType::Float, false, false)
            .unwrap()
            .end()
            .unwrap();

        renderer.alloc_transient_vertex_buffer(64, &decl).unwrap();
        let empty = renderer.alloc_transient_vertex_buffer(0, &position_only).unwrap();
        assert!(renderer.transient_vertex_bytes_mut(&empty).unwrap().is_empty());
        let (tvb, tib) = renderer.alloc_transient_buffers(&position_only, 0, 3).unwrap();
        assert_eq!(tvb.num_vertices(), 0);
        assert_eq!(tib.num_indices(), 3);

        assert_eq!(renderer.frame().unwrap(), 0);
        assert_eq!(renderer.stats().transient.vertex_bytes, 16 * 64);
        assert_eq!(renderer.stats().transient.index_bytes, 6);
    }

    #[test]
    fn texture_storage_past_u32() {
        let (mut renderer, _) = recording();
        let (texture, info) = renderer
            .create_texture_2d(16384, 16384, 1, TextureFormat::RGBA32F, TextureFlags::empty(), None)
            .unwrap();
        assert_eq!(info.storage_size, 1 << 32);
        renderer.destroy_texture(texture).unwrap();

        let result = renderer.create_texture_2d(
            16384,
            16384,
            1,
            TextureFormat::RGBA32F,
            TextureFlags::empty(),
            Some(&[0u8; 16]),
        );
        assert!(matches!(
            result,
            Err(RenderError::DataSize { what: "texture", actual: 16, .. })
        ));
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(result, Err(RenderError::DataSize { expected, .. }) if expected == 1 << 32));
    }

    #[test]
    fn program_from_one_shader_releases_it_once() {
        let (mut renderer, recorded) = recording();
        let shader = renderer.create_shader(b"CSH\x01cs").unwrap();
        let program = renderer.create_program(shader, shader, true).unwrap();
        assert_eq!(renderer.registry.counts().shaders, 1);

        renderer.destroy_program(program).unwrap();
        assert_eq!(renderer.registry.counts().total(), 0);
        let recorded = recorded.borrow();
        let destroyed = recorded.commands.iter().filter(|c| *c == "DestroyShader").count();
        assert_eq!(destroyed, 1);
    }

    #[test]
    fn cached_transforms_are_reused() {
        let (mut renderer, _) = recording();
        let program = program(&mut renderer);
        let mtx = [
            Mat4::IDENTITY,
            Mat4::from_translation(glam::Vec3::X),
            Mat4::from_scale(glam::Vec3::splat(2.0)),
        ];
        assert_eq!(renderer.set_transforms(&mtx).unwrap(), 0);
        renderer.set_program(program).unwrap();
        renderer.submit(ViewId(0), 0).unwrap();

        renderer.set_transform_cached(1, 2).unwrap();
        assert_eq!(renderer.draw.transform, Some(TransformRange { first: 1, num: 2 }));
        renderer.set_program(program).unwrap();
        renderer.submit(ViewId(0), 0).unwrap();
        assert_eq!(renderer.draws[1].draw.transform, Some(TransformRange { first: 1, num: 2 }));

        assert!(matches!(
            renderer.set_transform_cached(2, 2),
            Err(RenderError::DataSize { what: "transform cache", expected: 3, actual: 4 })
        ));
        assert!(renderer.set_transform_cached(0, 0).is_err());

        renderer.frame().unwrap();
        assert_eq!(renderer.stats().transforms, 3);
        assert!(renderer.set_transform_cached(0, 1).is_err());
    }

    #[test]
    fn touch_consumes_pending_state() {
        let (mut renderer, _) = recording();
        let program = program(&mut renderer);
        renderer.set_transform(&Mat4::IDENTITY);
        renderer.set_program(program).unwrap();
        assert_eq!(renderer.touch(ViewId(4)).unwrap(), 0);

        let touch = &renderer.draws[0];
        assert!(touch.is_touch());
        assert_eq!(touch.draw.transform, Some(TransformRange { first: 0, num: 1 }));
        assert!(matches!(renderer.submit(ViewId(4), 0), Err(RenderError::NoProgram)));

        renderer.frame().unwrap();
        assert_eq!(renderer.stats().num_draws, 0);
        assert_eq!(renderer.stats().draws_in_view(ViewId(4)), 0);
        assert_eq!(renderer.stats().view_draws, vec![(ViewId(4), 0)]);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn stats_carry_running_totals() {
        let (mut renderer, _) = recording();
        let program = program(&mut renderer);
        for _ in 0..3 {
            renderer.set_program(program).unwrap();
            renderer.submit(ViewId(0), 0).unwrap();
            renderer.frame().unwrap();
        }
        assert_eq!(renderer.stats().num_draws, 1);
        assert_eq!(renderer.stats().total_draws, 3);
        assert_eq!(renderer.stats().total_primitives, 0);
    }
}
