//! Resource registry
//!
//! Bookkeeping for every GPU-side object the recorder hands out. Buffer and
//! texture contents go to the backend; the registry keeps only what the
//! recorder needs to validate draws and release resources in order.

use crate::error::{RenderError, Result};
use crate::resource::{
    FrameBuffer, FrameBufferHandle, IndexBuffer, IndexBufferHandle, Program, ProgramHandle,
    Shader, ShaderHandle, ShaderStage, Texture, TextureHandle, Uniform, UniformHandle,
    UniformType, VertexBuffer, VertexBufferHandle,
};
use crate::texture::{TextureFlags, TextureInfo};
use std::collections::HashMap;
use tessel_core::{HandleError, HandlePool, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferRecord {
    pub size: u32,
    pub stride: u16,
}

impl VertexBufferRecord {
    pub fn num_vertices(&self) -> u32 {
        self.size / self.stride.max(1) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBufferRecord {
    pub size: u32,
    pub index32: bool,
}

impl IndexBufferRecord {
    pub fn num_indices(&self) -> u32 {
        self.size / if self.index32 { 4 } else { 2 }
    }
}

/// Shaders are shared by programs. A shader is freed once the caller has
/// released it and no program still references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderRecord {
    pub stage: ShaderStage,
    pub size: u32,
    refs: u16,
    released: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramRecord {
    pub vs: ShaderHandle,
    pub fs: ShaderHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRecord {
    pub info: TextureInfo,
    pub flags: TextureFlags,
    /// Frame buffer that destroys this texture along with itself
    pub owner: Option<FrameBufferHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBufferRecord {
    pub attachments: Vec<TextureHandle>,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformRecord {
    pub name: String,
    pub ty: UniformType,
    pub num: u16,
    refs: u16,
}

impl UniformRecord {
    /// `f32` slots this uniform holds.
    pub fn capacity(&self) -> usize {
        self.ty.floats() * self.num as usize
    }
}

/// Live handle counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub vertex_buffers: usize,
    pub index_buffers: usize,
    pub shaders: usize,
    pub programs: usize,
    pub textures: usize,
    pub frame_buffers: usize,
    pub uniforms: usize,
}

impl ResourceCounts {
    pub fn total(&self) -> usize {
        self.vertex_buffers
            + self.index_buffers
            + self.shaders
            + self.programs
            + self.textures
            + self.frame_buffers
            + self.uniforms
    }
}

/// What a program destroy released.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProgramRelease {
    pub shaders: Vec<ShaderHandle>,
}

/// What a frame buffer destroy released.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FrameBufferRelease {
    pub textures: Vec<TextureHandle>,
}

pub struct ResourceRegistry {
    vertex_buffers: HandlePool<VertexBuffer, VertexBufferRecord>,
    index_buffers: HandlePool<IndexBuffer, IndexBufferRecord>,
    shaders: HandlePool<Shader, ShaderRecord>,
    programs: HandlePool<Program, ProgramRecord>,
    textures: HandlePool<Texture, TextureRecord>,
    frame_buffers: HandlePool<FrameBuffer, FrameBufferRecord>,
    uniforms: HandlePool<Uniform, UniformRecord>,
    uniform_names: HashMap<String, UniformHandle>,
}

fn stale<K: ResourceKind>(handle: tessel_core::Handle<K>) -> RenderError {
    RenderError::Handle(HandleError::Stale {
        kind: K::NAME,
        index: handle.index(),
        generation: handle.generation(),
    })
}

impl ResourceRegistry {
    pub fn new(max_handles: u16) -> Self {
        let limit = max_handles as usize;
        Self {
            vertex_buffers: HandlePool::with_limit(limit),
            index_buffers: HandlePool::with_limit(limit),
            shaders: HandlePool::with_limit(limit),
            programs: HandlePool::with_limit(limit),
            textures: HandlePool::with_limit(limit),
            frame_buffers: HandlePool::with_limit(limit),
            uniforms: HandlePool::with_limit(limit),
            uniform_names: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Vertex / index buffers
    // ------------------------------------------------------------------

    pub fn add_vertex_buffer(&mut self, record: VertexBufferRecord) -> Result<VertexBufferHandle> {
        Ok(self.vertex_buffers.alloc(record)?)
    }

    pub fn vertex_buffer(&self, handle: VertexBufferHandle) -> Result<&VertexBufferRecord> {
        Ok(self.vertex_buffers.try_get(handle)?)
    }

    pub fn remove_vertex_buffer(&mut self, handle: VertexBufferHandle) -> Result<VertexBufferRecord> {
        Ok(self.vertex_buffers.free(handle)?)
    }

    pub fn add_index_buffer(&mut self, record: IndexBufferRecord) -> Result<IndexBufferHandle> {
        Ok(self.index_buffers.alloc(record)?)
    }

    pub fn index_buffer(&self, handle: IndexBufferHandle) -> Result<&IndexBufferRecord> {
        Ok(self.index_buffers.try_get(handle)?)
    }

    pub fn remove_index_buffer(&mut self, handle: IndexBufferHandle) -> Result<IndexBufferRecord> {
        Ok(self.index_buffers.free(handle)?)
    }

    // ------------------------------------------------------------------
    // Shaders / programs
    // ------------------------------------------------------------------

    pub fn add_shader(&mut self, stage: ShaderStage, size: u32) -> Result<ShaderHandle> {
        Ok(self.shaders.alloc(ShaderRecord {
            stage,
            size,
            refs: 1,
            released: false,
        })?)
    }

    /// Resolve a shader the caller still owns.
    pub fn shader(&self, handle: ShaderHandle) -> Result<&ShaderRecord> {
        match self.shaders.get(handle) {
            Some(record) if !record.released => Ok(record),
            _ => Err(stale(handle)),
        }
    }

    /// Drop the caller's reference. Returns true when the shader was freed.
    pub fn release_shader(&mut self, handle: ShaderHandle) -> Result<bool> {
        let record = self
            .shaders
            .get_mut(handle)
            .filter(|r| !r.released)
            .ok_or_else(|| stale(handle))?;
        record.released = true;
        self.unref_shader(handle)
    }

    fn unref_shader(&mut self, handle: ShaderHandle) -> Result<bool> {
        let record = self.shaders.try_get_mut(handle)?;
        record.refs = record.refs.saturating_sub(1);
        if record.refs == 0 {
            self.shaders.free(handle)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn add_program(&mut self, vs: ShaderHandle, fs: ShaderHandle) -> Result<ProgramHandle> {
        self.shader(vs)?;
        self.shader(fs)?;
        let handle = self.programs.alloc(ProgramRecord { vs, fs })?;
        for shader in [vs, fs] {
            self.shaders.try_get_mut(shader)?.refs += 1;
        }
        Ok(handle)
    }

    pub fn program(&self, handle: ProgramHandle) -> Result<&ProgramRecord> {
        Ok(self.programs.try_get(handle)?)
    }

    pub fn remove_program(&mut self, handle: ProgramHandle) -> Result<ProgramRelease> {
        let record = self.programs.free(handle)?;
        let mut release = ProgramRelease::default();
        for shader in [record.vs, record.fs] {
            if self.unref_shader(shader)? {
                release.shaders.push(shader);
            }
        }
        Ok(release)
    }

    // ------------------------------------------------------------------
    // Textures / frame buffers
    // ------------------------------------------------------------------

    pub fn add_texture(&mut self, info: TextureInfo, flags: TextureFlags) -> Result<TextureHandle> {
        Ok(self.textures.alloc(TextureRecord {
            info,
            flags,
            owner: None,
        })?)
    }

    pub fn texture(&self, handle: TextureHandle) -> Result<&TextureRecord> {
        Ok(self.textures.try_get(handle)?)
    }

    pub fn remove_texture(&mut self, handle: TextureHandle) -> Result<TextureRecord> {
        Ok(self.textures.free(handle)?)
    }

    /// Register a frame buffer over existing textures. With `own_textures`
    /// the textures are destroyed together with the frame buffer.
    pub fn add_frame_buffer(
        &mut self,
        attachments: &[TextureHandle],
        own_textures: bool,
    ) -> Result<FrameBufferHandle> {
        let first = attachments.first().ok_or(RenderError::EmptyData {
            what: "frame buffer attachments",
        })?;
        let first = self.texture(*first)?.info;
        for &texture in attachments {
            self.texture(texture)?;
        }

        let handle = self.frame_buffers.alloc(FrameBufferRecord {
            attachments: attachments.to_vec(),
            width: first.width,
            height: first.height,
        })?;
        if own_textures {
            for &texture in attachments {
                self.textures.try_get_mut(texture)?.owner = Some(handle);
            }
        }
        Ok(handle)
    }

    pub fn frame_buffer(&self, handle: FrameBufferHandle) -> Result<&FrameBufferRecord> {
        Ok(self.frame_buffers.try_get(handle)?)
    }

    /// Texture bound at `attachment` of a frame buffer.
    pub fn frame_buffer_texture(
        &self,
        handle: FrameBufferHandle,
        attachment: u8,
    ) -> Result<TextureHandle> {
        let record = self.frame_buffer(handle)?;
        record
            .attachments
            .get(attachment as usize)
            .copied()
            .ok_or(RenderError::Attachment {
                attachment,
                count: record.attachments.len(),
            })
    }

    pub fn remove_frame_buffer(&mut self, handle: FrameBufferHandle) -> Result<FrameBufferRelease> {
        let record = self.frame_buffers.free(handle)?;
        let mut release = FrameBufferRelease::default();
        for texture in record.attachments {
            let owned = self
                .textures
                .get(texture)
                .is_some_and(|t| t.owner == Some(handle));
            if owned {
                self.textures.free(texture)?;
                release.textures.push(texture);
            }
        }
        Ok(release)
    }

    // ------------------------------------------------------------------
    // Uniforms
    // ------------------------------------------------------------------

    /// Register a uniform by name. A name that is already registered returns
    /// the existing handle with one more reference; the second value is true
    /// when the handle is new.
    pub fn add_uniform(
        &mut self,
        name: &str,
        ty: UniformType,
        num: u16,
    ) -> Result<(UniformHandle, bool)> {
        if let Some(&handle) = self.uniform_names.get(name) {
            let record = self.uniforms.try_get_mut(handle)?;
            record.refs += 1;
            if record.ty != ty || record.num < num {
                tracing::warn!(
                    "uniform `{}` re-registered as {:?}x{} (keeping {:?}x{})",
                    name,
                    ty,
                    num,
                    record.ty,
                    record.num
                );
            }
            return Ok((handle, false));
        }

        let handle = self.uniforms.alloc(UniformRecord {
            name: name.to_string(),
            ty,
            num: num.max(1),
            refs: 1,
        })?;
        self.uniform_names.insert(name.to_string(), handle);
        Ok((handle, true))
    }

    pub fn uniform(&self, handle: UniformHandle) -> Result<&UniformRecord> {
        Ok(self.uniforms.try_get(handle)?)
    }

    /// Drop one reference. Returns true when the uniform was freed.
    pub fn release_uniform(&mut self, handle: UniformHandle) -> Result<bool> {
        let record = self.uniforms.try_get_mut(handle)?;
        record.refs = record.refs.saturating_sub(1);
        if record.refs > 0 {
            return Ok(false);
        }
        let record = self.uniforms.free(handle)?;
        self.uniform_names.remove(&record.name);
        Ok(true)
    }

    // ------------------------------------------------------------------

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            vertex_buffers: self.vertex_buffers.len(),
            index_buffers: self.index_buffers.len(),
            shaders: self.shaders.len(),
            programs: self.programs.len(),
            textures: self.textures.len(),
            frame_buffers: self.frame_buffers.len(),
            uniforms: self.uniforms.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{calc_texture_size, TextureFormat};

    fn texture(registry: &mut ResourceRegistry) -> TextureHandle {
        let info = calc_texture_size(64, 32, 1, false, 1, TextureFormat::BGRA8);
        registry.add_texture(info, TextureFlags::RT).unwrap()
    }

    #[test]
    fn double_destroy_is_stale() {
        let mut registry = ResourceRegistry::new(16);
        let vb = registry
            .add_vertex_buffer(VertexBufferRecord {
                size: 64,
                stride: 16,
            })
            .unwrap();
        assert_eq!(registry.vertex_buffer(vb).unwrap().num_vertices(), 4);
        registry.remove_vertex_buffer(vb).unwrap();
        assert!(matches!(
            registry.remove_vertex_buffer(vb),
            Err(RenderError::Handle(HandleError::Stale { .. }))
        ));
        assert!(registry.vertex_buffer(vb).is_err());
    }

    #[test]
    fn exhaustion_is_recoverable() {
        let mut registry = ResourceRegistry::new(2);
        let record = IndexBufferRecord {
            size: 12,
            index32: false,
        };
        let first = registry.add_index_buffer(record.clone()).unwrap();
        registry.add_index_buffer(record.clone()).unwrap();
        assert!(matches!(
            registry.add_index_buffer(record.clone()),
            Err(RenderError::Handle(HandleError::Exhausted { limit: 2, .. }))
        ));

        registry.remove_index_buffer(first).unwrap();
        assert!(registry.add_index_buffer(record).is_ok());
    }

    #[test]
    fn shaders_outlive_their_release_while_programs_hold_them() {
        let mut registry = ResourceRegistry::new(16);
        let vs = registry.add_shader(ShaderStage::Vertex, 10).unwrap();
        let fs = registry.add_shader(ShaderStage::Fragment, 10).unwrap();
        let program = registry.add_program(vs, fs).unwrap();

        // Caller drops its shader refs; program still holds them
        assert!(!registry.release_shader(vs).unwrap());
        assert!(!registry.release_shader(fs).unwrap());
        assert_eq!(registry.counts().shaders, 2);

        // Released shaders cannot be released again or linked
        assert!(registry.release_shader(vs).is_err());
        assert!(registry.add_program(vs, fs).is_err());

        let release = registry.remove_program(program).unwrap();
        assert_eq!(release.shaders, vec![vs, fs]);
        assert_eq!(registry.counts().shaders, 0);
    }

    #[test]
    fn program_keeps_unreleased_shaders() {
        let mut registry = ResourceRegistry::new(16);
        let vs = registry.add_shader(ShaderStage::Vertex, 10).unwrap();
        let fs = registry.add_shader(ShaderStage::Fragment, 10).unwrap();
        let program = registry.add_program(vs, fs).unwrap();
        let release = registry.remove_program(program).unwrap();
        assert!(release.shaders.is_empty());
        assert!(registry.shader(vs).is_ok());
        assert!(registry.release_shader(vs).unwrap());
    }

    #[test]
    fn uniform_names_are_refcounted() {
        let mut registry = ResourceRegistry::new(16);
        let (a, new_a) = registry.add_uniform("u_color", UniformType::Vec4, 1).unwrap();
        let (b, new_b) = registry.add_uniform("u_color", UniformType::Vec4, 1).unwrap();
        assert_eq!(a, b);
        assert!(new_a);
        assert!(!new_b);
        assert_eq!(registry.uniform(a).unwrap().capacity(), 4);

        assert!(!registry.release_uniform(a).unwrap());
        assert!(registry.release_uniform(a).unwrap());
        assert!(registry.uniform(a).is_err());

        // Name is free again
        let (c, new_c) = registry.add_uniform("u_color", UniformType::Mat4, 2).unwrap();
        assert!(new_c);
        assert_ne!(a, c);
        assert_eq!(registry.uniform(c).unwrap().capacity(), 32);
    }

    #[test]
    fn frame_buffer_owns_textures() {
        let mut registry = ResourceRegistry::new(16);
        let color = texture(&mut registry);
        let fb = registry.add_frame_buffer(&[color], true).unwrap();
        assert_eq!(registry.frame_buffer(fb).unwrap().width, 64);
        assert_eq!(registry.frame_buffer_texture(fb, 0).unwrap(), color);
        assert!(matches!(
            registry.frame_buffer_texture(fb, 1),
            Err(RenderError::Attachment { attachment: 1, count: 1 })
        ));

        let release = registry.remove_frame_buffer(fb).unwrap();
        assert_eq!(release.textures, vec![color]);
        assert!(registry.texture(color).is_err());
    }

    #[test]
    fn frame_buffer_over_borrowed_textures() {
        let mut registry = ResourceRegistry::new(16);
        let color = texture(&mut registry);
        let fb = registry.add_frame_buffer(&[color], false).unwrap();
        let release = registry.remove_frame_buffer(fb).unwrap();
        assert!(release.textures.is_empty());
        assert!(registry.texture(color).is_ok());

        assert!(matches!(
            registry.add_frame_buffer(&[], false),
            Err(RenderError::EmptyData { .. })
        ));
    }
}
