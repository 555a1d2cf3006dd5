//! Per-draw state accumulator
//!
//! Setters overwrite one slot of the pending draw. `take` snapshots the
//! draw and resets every slot, which is what submit and discard build on.

use crate::error::{RenderError, Result};
use crate::resource::{
    IndexBufferHandle, ProgramHandle, TextureHandle, UniformHandle, VertexBufferHandle,
};
use crate::state::State;
use crate::texture::TextureFlags;
use crate::transient::InstanceBinding;
use crate::view::{Rect, ViewId};
use std::ops::Range;

/// Texture stages per draw.
pub const MAX_TEXTURE_STAGES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSource {
    Static {
        handle: VertexBufferHandle,
        start: u32,
        num: u32,
    },
    /// Region of the frame's transient vertex ring
    Transient {
        base_vertex: u32,
        num: u32,
        stride: u16,
    },
}

impl VertexSource {
    pub fn num_vertices(&self) -> u32 {
        match *self {
            VertexSource::Static { num, .. } | VertexSource::Transient { num, .. } => num,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Static {
        handle: IndexBufferHandle,
        first: u32,
        num: u32,
        index32: bool,
    },
    /// Region of the frame's transient index ring (16-bit)
    Transient { first: u32, num: u32 },
}

impl IndexSource {
    pub fn num_indices(&self) -> u32 {
        match *self {
            IndexSource::Static { num, .. } | IndexSource::Transient { num, .. } => num,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub sampler: UniformHandle,
    pub texture: TextureHandle,
    /// `None` keeps the sampler flags the texture was created with
    pub flags: Option<TextureFlags>,
}

/// Slice of the frame's transform cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformRange {
    pub first: u32,
    pub num: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StencilState {
    pub front: u32,
    pub back: u32,
}

/// The pending draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawState {
    pub program: Option<ProgramHandle>,
    pub state: State,
    /// Constant blend color, 0xRRGGBBAA
    pub blend_factor: u32,
    pub stencil: StencilState,
    pub scissor: Option<Rect>,
    pub transform: Option<TransformRange>,
    pub vertex: Option<VertexSource>,
    pub index: Option<IndexSource>,
    pub instances: Option<InstanceBinding>,
    pub textures: [Option<TextureBinding>; MAX_TEXTURE_STAGES],
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            program: None,
            state: State::DEFAULT,
            blend_factor: 0,
            stencil: StencilState::default(),
            scissor: None,
            transform: None,
            vertex: None,
            index: None,
            instances: None,
            textures: [None; MAX_TEXTURE_STAGES],
        }
    }
}

impl DrawState {
    pub fn set_texture(&mut self, stage: u8, binding: TextureBinding) -> Result<()> {
        let slot = self
            .textures
            .get_mut(stage as usize)
            .ok_or(RenderError::TextureStage {
                stage,
                max: MAX_TEXTURE_STAGES as u8 - 1,
            })?;
        *slot = Some(binding);
        Ok(())
    }

    /// Snapshot the draw and reset every slot.
    pub fn take(&mut self) -> DrawState {
        std::mem::take(self)
    }

    /// Number of instances this draw renders.
    pub fn num_instances(&self) -> u32 {
        self.instances.map_or(1, |i| i.num)
    }
}

/// A submitted draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDraw {
    pub view: ViewId,
    pub depth: u32,
    /// Submission order within the frame
    pub sequence: u32,
    pub draw: DrawState,
    /// Updates in [`UniformBuffer`] applied before this draw
    pub uniforms: Range<usize>,
}

impl RenderDraw {
    /// Draws without a program only clear their view.
    pub fn is_touch(&self) -> bool {
        self.draw.program.is_none()
    }

    pub fn sort_key(&self) -> (ViewId, u32) {
        (self.view, self.sequence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformUpdate {
    pub handle: UniformHandle,
    pub offset: u32,
    pub len: u32,
}

/// Uniform values set during a frame, in order.
#[derive(Debug, Clone, Default)]
pub struct UniformBuffer {
    updates: Vec<UniformUpdate>,
    data: Vec<f32>,
    limit: usize,
}

impl UniformBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            updates: Vec::new(),
            data: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, handle: UniformHandle, values: &[f32]) -> Result<()> {
        let available = self.limit.saturating_sub(self.data.len());
        if values.len() > available {
            return Err(RenderError::TransientExhausted {
                what: "uniform",
                requested: values.len() * std::mem::size_of::<f32>(),
                available: available * std::mem::size_of::<f32>(),
            });
        }
        self.updates.push(UniformUpdate {
            handle,
            offset: self.data.len() as u32,
            len: values.len() as u32,
        });
        self.data.extend_from_slice(values);
        Ok(())
    }

    /// Current end of the update list.
    pub fn mark(&self) -> usize {
        self.updates.len()
    }

    /// Drop every update after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        if let Some(update) = self.updates.get(mark) {
            self.data.truncate(update.offset as usize);
            self.updates.truncate(mark);
        }
    }

    pub fn updates(&self) -> &[UniformUpdate] {
        &self.updates
    }

    pub fn values(&self, update: &UniformUpdate) -> &[f32] {
        let start = update.offset as usize;
        &self.data[start..start + update.len as usize]
    }

    pub fn len_floats(&self) -> usize {
        self.data.len()
    }

    pub fn clear(&mut self) {
        self.updates.clear();
        self.data.clear();
    }
}
