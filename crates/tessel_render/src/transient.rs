//! Per-frame transient memory
//!
//! Three linear rings (vertices, 16-bit indices, instance data) that are
//! rewound at every frame boundary. Regions handed out carry the frame they
//! were allocated in; using one after the boundary is reported instead of
//! aliasing the next frame's data.

use crate::error::{RenderError, Result};
use crate::vertex::VertexDecl;
use std::io;
use tessel_core::memory::AllocationTracker;

/// Size of one transient index.
pub const INDEX_SIZE: usize = 2;

/// Instance records are uploaded as rows of vec4s.
pub const INSTANCE_ALIGN: u16 = 16;

/// Linear allocator over a 16-byte aligned block.
pub(crate) struct TransientRing {
    what: &'static str,
    storage: Vec<u128>,
    capacity: usize,
    cursor: usize,
    tracker: AllocationTracker,
}

impl TransientRing {
    pub(crate) fn new(what: &'static str, capacity: usize) -> Self {
        Self {
            what,
            storage: vec![0; capacity.div_ceil(16)],
            capacity,
            cursor: 0,
            tracker: AllocationTracker::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    fn aligned_cursor(&self, align: usize) -> usize {
        self.cursor.next_multiple_of(align.max(1))
    }

    /// Number of `size`-byte elements that still fit at `align`.
    pub(crate) fn available(&self, size: usize, align: usize) -> usize {
        if size == 0 {
            return 0;
        }
        let start = self.aligned_cursor(align);
        self.capacity.saturating_sub(start) / size
    }

    pub(crate) fn alloc(&mut self, size: usize, align: usize) -> Result<usize> {
        // Empty regions never move the cursor, so it stays within capacity
        if size == 0 {
            return Ok(self.aligned_cursor(align).min(self.capacity));
        }
        let start = self.aligned_cursor(align);
        let available = self.capacity.saturating_sub(start);
        if size > available {
            return Err(RenderError::TransientExhausted {
                what: self.what,
                requested: size,
                available,
            });
        }
        self.tracker.record_allocation(start + size - self.cursor);
        self.cursor = start + size;
        Ok(start)
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u128, u8>(&self.storage)[..self.capacity]
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u128, u8>(&mut self.storage)[..self.capacity]
    }

    /// Bytes written this frame.
    pub(crate) fn used(&self) -> &[u8] {
        &self.bytes()[..self.cursor]
    }

    pub(crate) fn rewind(&mut self) -> usize {
        self.cursor = 0;
        self.tracker.reset_frame()
    }

    pub(crate) fn peak(&self) -> usize {
        self.tracker.peak()
    }
}

/// Vertex region in the current frame's transient ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientVertexBuffer {
    pub(crate) start: u32,
    pub(crate) size: u32,
    pub(crate) num_vertices: u32,
    pub(crate) stride: u16,
    pub(crate) frame: u32,
}

impl TransientVertexBuffer {
    /// Byte offset in the ring.
    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn num_vertices(&self) -> u32 {
        self.num_vertices
    }

    pub fn stride(&self) -> u16 {
        self.stride
    }

    /// First vertex of the region, counted in strides from the ring start.
    pub fn base_vertex(&self) -> u32 {
        self.start / self.stride.max(1) as u32
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

/// 16-bit index region in the current frame's transient ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientIndexBuffer {
    pub(crate) start: u32,
    pub(crate) num_indices: u32,
    pub(crate) frame: u32,
}

impl TransientIndexBuffer {
    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn num_indices(&self) -> u32 {
        self.num_indices
    }

    /// First index of the region, counted from the ring start.
    pub fn first_index(&self) -> u32 {
        self.start / INDEX_SIZE as u32
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

/// Instance records for one frame.
///
/// Filled through [`io::Write`]; writes past capacity are cut short and
/// then return `Ok(0)`. Bound with
/// [`crate::Renderer::set_instance_data_buffer`], which copies the records
/// into the frame's instance ring.
///
/// ```ignore
/// let mut idb = renderer.alloc_instance_data_buffer(121, 80)?;
/// for mtx in &transforms {
///     idb.write_all(bytemuck::bytes_of(mtx))?;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDataBuffer {
    data: Vec<u8>,
    cursor: usize,
    offset: u32,
    stride: u16,
    num: u32,
    frame: u32,
}

impl InstanceDataBuffer {
    pub fn stride(&self) -> u16 {
        self.stride
    }

    /// Records this buffer has room for.
    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

impl io::Write for InstanceDataBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        self.data[self.cursor..self.cursor + n].copy_from_slice(&buf[..n]);
        self.cursor += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Instance records bound to a draw: a slice of the frame's instance ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceBinding {
    pub offset: u32,
    pub stride: u16,
    pub num: u32,
}

/// Bytes used by each ring in the frame that just ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransientUsage {
    pub vertex_bytes: usize,
    pub index_bytes: usize,
    pub instance_bytes: usize,
}

pub(crate) struct TransientBuffers {
    vertices: TransientRing,
    indices: TransientRing,
    instances: TransientRing,
    frame: u32,
}

impl TransientBuffers {
    pub(crate) fn new(vertex_bytes: u32, index_bytes: u32, instance_bytes: u32) -> Self {
        Self {
            vertices: TransientRing::new("vertex", vertex_bytes as usize),
            indices: TransientRing::new("index", index_bytes as usize),
            instances: TransientRing::new("instance", instance_bytes as usize),
            frame: 0,
        }
    }

    pub(crate) fn frame(&self) -> u32 {
        self.frame
    }

    fn check_frame(&self, allocated: u32) -> Result<()> {
        if allocated == self.frame {
            Ok(())
        } else {
            Err(RenderError::StaleTransient {
                allocated,
                current: self.frame,
            })
        }
    }

    pub(crate) fn available_vertices(&self, num: u32, decl: &VertexDecl) -> u32 {
        let stride = decl.stride() as usize;
        (self.vertices.available(stride, stride) as u64).min(num as u64) as u32
    }

    pub(crate) fn available_indices(&self, num: u32) -> u32 {
        (self.indices.available(INDEX_SIZE, INDEX_SIZE) as u64).min(num as u64) as u32
    }

    pub(crate) fn alloc_vertices(
        &mut self,
        num: u32,
        decl: &VertexDecl,
    ) -> Result<TransientVertexBuffer> {
        decl.expect_ended("alloc_transient_vertex_buffer")?;
        let stride = decl.stride();
        let size = decl.size(num);
        let start = self.vertices.alloc(size, stride as usize)?;
        Ok(TransientVertexBuffer {
            start: start as u32,
            size: size as u32,
            num_vertices: num,
            stride,
            frame: self.frame,
        })
    }

    pub(crate) fn alloc_indices(&mut self, num: u32) -> Result<TransientIndexBuffer> {
        let start = self.indices.alloc(num as usize * INDEX_SIZE, INDEX_SIZE)?;
        Ok(TransientIndexBuffer {
            start: start as u32,
            num_indices: num,
            frame: self.frame,
        })
    }

    /// Both regions or neither.
    pub(crate) fn alloc_both(
        &mut self,
        decl: &VertexDecl,
        num_vertices: u32,
        num_indices: u32,
    ) -> Option<(TransientVertexBuffer, TransientIndexBuffer)> {
        if !decl.is_ended()
            || self.available_vertices(num_vertices, decl) < num_vertices
            || self.available_indices(num_indices) < num_indices
        {
            return None;
        }
        let tvb = self.alloc_vertices(num_vertices, decl).ok()?;
        let tib = self.alloc_indices(num_indices).ok()?;
        Some((tvb, tib))
    }

    pub(crate) fn alloc_instances(&mut self, num: u32, stride: u16) -> Result<InstanceDataBuffer> {
        if stride == 0 || stride % INSTANCE_ALIGN != 0 {
            return Err(RenderError::InstanceStride(stride));
        }
        let num = (self.instances.available(stride as usize, INSTANCE_ALIGN as usize) as u64)
            .min(num as u64) as u32;
        let size = num as usize * stride as usize;
        let offset = self.instances.alloc(size, INSTANCE_ALIGN as usize)?;
        Ok(InstanceDataBuffer {
            data: vec![0; size],
            cursor: 0,
            offset: offset as u32,
            stride,
            num,
            frame: self.frame,
        })
    }

    pub(crate) fn vertex_bytes_mut(&mut self, tvb: &TransientVertexBuffer) -> Result<&mut [u8]> {
        self.check_frame(tvb.frame)?;
        let start = tvb.start as usize;
        Ok(&mut self.vertices.bytes_mut()[start..start + tvb.size as usize])
    }

    pub(crate) fn indices_mut(&mut self, tib: &TransientIndexBuffer) -> Result<&mut [u16]> {
        self.check_frame(tib.frame)?;
        let start = tib.start as usize;
        let bytes = &mut self.indices.bytes_mut()[start..start + tib.num_indices as usize * INDEX_SIZE];
        bytemuck::try_cast_slice_mut(bytes).map_err(|_| RenderError::Misaligned { align: INDEX_SIZE })
    }

    pub(crate) fn check_vertices(&self, tvb: &TransientVertexBuffer) -> Result<()> {
        self.check_frame(tvb.frame)
    }

    pub(crate) fn check_indices(&self, tib: &TransientIndexBuffer) -> Result<()> {
        self.check_frame(tib.frame)
    }

    /// Copy the first `num` records of `idb` into the instance ring.
    pub(crate) fn commit_instances(
        &mut self,
        idb: &InstanceDataBuffer,
        num: u32,
    ) -> Result<InstanceBinding> {
        self.check_frame(idb.frame)?;
        let num = num.min(idb.num);
        let size = num as usize * idb.stride as usize;
        let offset = idb.offset as usize;
        self.instances.bytes_mut()[offset..offset + size].copy_from_slice(&idb.data[..size]);
        Ok(InstanceBinding {
            offset: idb.offset,
            stride: idb.stride,
            num,
        })
    }

    pub(crate) fn vertex_data(&self) -> &[u8] {
        self.vertices.used()
    }

    pub(crate) fn index_data(&self) -> &[u8] {
        self.indices.used()
    }

    pub(crate) fn instance_data(&self) -> &[u8] {
        self.instances.used()
    }

    pub(crate) fn capacities(&self) -> TransientUsage {
        TransientUsage {
            vertex_bytes: self.vertices.capacity(),
            index_bytes: self.indices.capacity(),
            instance_bytes: self.instances.capacity(),
        }
    }

    pub(crate) fn peaks(&self) -> TransientUsage {
        TransientUsage {
            vertex_bytes: self.vertices.peak(),
            index_bytes: self.indices.peak(),
            instance_bytes: self.instances.peak(),
        }
    }

    /// Rewind every ring and move to `next_frame`. Regions from earlier
    /// frames become stale.
    pub(crate) fn end_frame(&mut self, next_frame: u32) -> TransientUsage {
        self.frame = next_frame;
        TransientUsage {
            vertex_bytes: self.vertices.rewind(),
            index_bytes: self.indices.rewind(),
            instance_bytes: self.instances.rewind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::{Attrib, AttribType};
    use std::io::Write;

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

    #[test]
    fn vertex_regions_align_to_stride() {
        let decl = decl();
        let mut buffers = TransientBuffers::new(1024, 64, 64);
        let idx = buffers.alloc_indices(3).unwrap();
        assert_eq!(idx.start(), 0);

        let first = buffers.alloc_vertices(3, &decl).unwrap();
        assert_eq!(first.start(), 0);
        assert_eq!(first.size(), 48);
        let second = buffers.alloc_vertices(1, &decl).unwrap();
        assert_eq!(second.start(), 48);
        assert_eq!(second.base_vertex(), 3);
    }

    #[test]
    fn combined_alloc_is_all_or_nothing() {
        let decl = decl();
        let mut buffers = TransientBuffers::new(16 * 8, 2 * 6, 64);

        // Vertices fit, indices don't: nothing is consumed
        assert!(buffers.alloc_both(&decl, 4, 7).is_none());
        assert_eq!(buffers.available_vertices(8, &decl), 8);
        assert_eq!(buffers.available_indices(6), 6);

        let (tvb, tib) = buffers.alloc_both(&decl, 4, 6).unwrap();
        assert_eq!(tvb.num_vertices(), 4);
        assert_eq!(tib.num_indices(), 6);

        // Exhausted ring never hands out a region past its end
        assert!(buffers.alloc_both(&decl, 5, 0).is_none());
        let rest = buffers.alloc_vertices(4, &decl).unwrap();
        assert_eq!(rest.start() + rest.size(), 16 * 8);
        assert!(matches!(
            buffers.alloc_vertices(1, &decl),
            Err(RenderError::TransientExhausted { available: 0, .. })
        ));
    }

    #[test]
    fn regions_go_stale_at_frame_end() {
        let decl = decl();
        let mut buffers = TransientBuffers::new(1024, 64, 64);
        let tvb = buffers.alloc_vertices(2, &decl).unwrap();
        let tib = buffers.alloc_indices(3).unwrap();
        assert_eq!(buffers.vertex_bytes_mut(&tvb).unwrap().len(), 32);
        buffers.indices_mut(&tib).unwrap().copy_from_slice(&[0, 1, 2]);
        assert_eq!(buffers.index_data(), bytemuck::cast_slice::<u16, u8>(&[0, 1, 2]));

        let usage = buffers.end_frame(1);
        assert_eq!(usage.vertex_bytes, 32);
        assert_eq!(usage.index_bytes, 6);
        assert!(matches!(
            buffers.vertex_bytes_mut(&tvb),
            Err(RenderError::StaleTransient { allocated: 0, current: 1 })
        ));
        assert!(buffers.indices_mut(&tib).is_err());
        assert!(buffers.index_data().is_empty());
    }

    #[test]
    fn instance_stride_must_be_vec4_rows() {
        let mut buffers = TransientBuffers::new(64, 64, 1024);
        assert!(matches!(
            buffers.alloc_instances(4, 12),
            Err(RenderError::InstanceStride(12))
        ));
        assert!(buffers.alloc_instances(4, 0).is_err());
        assert!(buffers.alloc_instances(4, 80).is_ok());
    }

    #[test]
    fn instance_count_is_clamped_to_ring() {
        let mut buffers = TransientBuffers::new(64, 64, 256);
        let idb = buffers.alloc_instances(100, 64).unwrap();
        assert_eq!(idb.num(), 4);
        let empty = buffers.alloc_instances(1, 64).unwrap();
        assert_eq!(empty.num(), 0);
    }

    #[test]
    fn instance_writes_saturate() {
        let mut buffers = TransientBuffers::new(64, 64, 1024);
        let mut idb = buffers.alloc_instances(2, 16).unwrap();
        assert_eq!(idb.write(&[1u8; 20]).unwrap(), 20);
        assert_eq!(idb.write(&[2u8; 20]).unwrap(), 12);
        assert_eq!(idb.write(&[3u8; 4]).unwrap(), 0);
        assert_eq!(idb.remaining(), 0);
        assert!(idb.write_all(&[4u8]).is_err());
        assert_eq!(idb.data()[31], 2);

        let binding = buffers.commit_instances(&idb, 5).unwrap();
        assert_eq!(binding.num, 2);
        assert_eq!(&buffers.instance_data()[..32], idb.data());
    }

    #[test]
    fn empty_regions_stay_inside_the_ring() {
        let mut position_only = VertexDecl::new();
        position_only
            .begin()
            .add(Attrib::Position, 3, AttribType::Float, false, false)
            .unwrap()
            .end()
            .unwrap();
        let mut buffers = TransientBuffers::new(20, 64, 64);
        buffers.alloc_vertices(1, &decl()).unwrap();

        // Aligning 16 up to a 12-byte stride would land past the end
        let empty = buffers.alloc_vertices(0, &position_only).unwrap();
        assert_eq!(empty.size(), 0);
        assert!(empty.start() <= 20);
        assert!(buffers.vertex_bytes_mut(&empty).unwrap().is_empty());
        assert_eq!(buffers.vertex_data().len(), 16);

        let (tvb, tib) = buffers.alloc_both(&position_only, 0, 2).unwrap();
        assert_eq!(tvb.num_vertices(), 0);
        assert_eq!(tib.num_indices(), 2);
        assert_eq!(buffers.vertex_data().len(), 16);
        assert_eq!(buffers.end_frame(1).vertex_bytes, 16);
    }
}
