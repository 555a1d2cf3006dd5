//! Vertex declarations
//!
//! A [`VertexDecl`] describes interleaved vertex attributes. It is built with
//! an explicit `begin -> {add | skip}* -> end` sequence and is immutable
//! afterwards, apart from [`VertexDecl::set_offset`] for hand-interleaved
//! streams.
//!
//! ```ignore
//! let mut decl = VertexDecl::new();
//! decl.begin()
//!     .add(Attrib::Position, 3, AttribType::Float, false, false)?
//!     .add(Attrib::Color0, 4, AttribType::Uint8, true, false)?
//!     .end()?;
//! assert_eq!(decl.stride(), 16);
//! ```

use crate::error::{RenderError, Result};
use bytemuck::Pod;
use half::f16;

pub const ATTRIB_COUNT: usize = 16;

/// Vertex attribute semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Attrib {
    Position = 0,
    Normal = 1,
    Tangent = 2,
    Bitangent = 3,
    Color0 = 4,
    Color1 = 5,
    Indices = 6,
    Weight = 7,
    TexCoord0 = 8,
    TexCoord1 = 9,
    TexCoord2 = 10,
    TexCoord3 = 11,
    TexCoord4 = 12,
    TexCoord5 = 13,
    TexCoord6 = 14,
    TexCoord7 = 15,
}

impl Attrib {
    pub const ALL: [Attrib; ATTRIB_COUNT] = [
        Attrib::Position,
        Attrib::Normal,
        Attrib::Tangent,
        Attrib::Bitangent,
        Attrib::Color0,
        Attrib::Color1,
        Attrib::Indices,
        Attrib::Weight,
        Attrib::TexCoord0,
        Attrib::TexCoord1,
        Attrib::TexCoord2,
        Attrib::TexCoord3,
        Attrib::TexCoord4,
        Attrib::TexCoord5,
        Attrib::TexCoord6,
        Attrib::TexCoord7,
    ];
}

/// Component storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttribType {
    Uint8 = 0,
    Int16 = 1,
    Half = 2,
    Float = 3,
}

impl AttribType {
    pub fn component_size(self) -> usize {
        match self {
            AttribType::Uint8 => 1,
            AttribType::Int16 | AttribType::Half => 2,
            AttribType::Float => 4,
        }
    }

    /// Bytes taken by `num` components. Three-component attributes of the
    /// small types are stored as four.
    pub fn storage_size(self, num: u8) -> u16 {
        let padded = match (self, num) {
            (AttribType::Float, n) => n,
            (_, 3) => 4,
            (_, n) => n,
        };
        (padded as usize * self.component_size()) as u16
    }
}

/// Decoded attribute description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribDesc {
    pub num: u8,
    pub ty: AttribType,
    pub normalized: bool,
    pub as_int: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Empty,
    Building,
    Ended,
}

impl Phase {
    fn describe(self) -> &'static str {
        match self {
            Phase::Empty => "not begun",
            Phase::Building => "still building",
            Phase::Ended => "already ended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexDecl {
    phase: Phase,
    hash: u32,
    stride: u16,
    offsets: [u16; ATTRIB_COUNT],
    attributes: [Option<AttribDesc>; ATTRIB_COUNT],
}

impl VertexDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a declaration. Discards anything added before.
    pub fn begin(&mut self) -> &mut Self {
        *self = Self {
            phase: Phase::Building,
            ..Self::default()
        };
        self
    }

    pub fn add(
        &mut self,
        attrib: Attrib,
        num: u8,
        ty: AttribType,
        normalized: bool,
        as_int: bool,
    ) -> Result<&mut Self> {
        self.expect_building("add")?;
        if !(1..=4).contains(&num) {
            return Err(RenderError::ComponentCount { attrib, num });
        }
        if self.attributes[attrib as usize].is_some() {
            return Err(RenderError::DuplicateAttrib(attrib));
        }
        let stride = self.grow(ty.storage_size(num))?;
        self.attributes[attrib as usize] = Some(AttribDesc {
            num,
            ty,
            normalized,
            as_int,
        });
        self.offsets[attrib as usize] = self.stride;
        self.stride = stride;
        Ok(self)
    }

    /// Leave `bytes` of padding before the next attribute.
    pub fn skip(&mut self, bytes: u8) -> Result<&mut Self> {
        self.expect_building("skip")?;
        self.stride = self.grow(bytes as u16)?;
        Ok(self)
    }

    fn grow(&self, bytes: u16) -> Result<u16> {
        self.stride
            .checked_add(bytes)
            .ok_or(RenderError::StrideOverflow {
                stride: self.stride,
                bytes,
            })
    }

    pub fn end(&mut self) -> Result<&mut Self> {
        self.expect_building("end")?;
        self.phase = Phase::Ended;
        self.hash = self.compute_hash();
        Ok(self)
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Size of one vertex in bytes. Only final after [`end`](Self::end).
    pub fn stride(&self) -> u16 {
        self.stride
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn has(&self, attrib: Attrib) -> bool {
        self.attributes[attrib as usize].is_some()
    }

    pub fn offset(&self, attrib: Attrib) -> Option<u16> {
        self.has(attrib).then(|| self.offsets[attrib as usize])
    }

    pub fn decode(&self, attrib: Attrib) -> Option<AttribDesc> {
        self.attributes[attrib as usize]
    }

    /// Override an attribute's byte offset after `end`.
    pub fn set_offset(&mut self, attrib: Attrib, offset: u16) -> Result<()> {
        if self.phase != Phase::Ended {
            return Err(RenderError::DeclState {
                op: "set_offset",
                phase: self.phase.describe(),
            });
        }
        if !self.has(attrib) {
            return Err(RenderError::MissingAttrib(attrib));
        }
        self.offsets[attrib as usize] = offset;
        self.hash = self.compute_hash();
        Ok(())
    }

    /// Present attributes in semantic order.
    pub fn attributes(&self) -> impl Iterator<Item = (Attrib, AttribDesc, u16)> + '_ {
        Attrib::ALL.iter().filter_map(move |&a| {
            self.attributes[a as usize].map(|desc| (a, desc, self.offsets[a as usize]))
        })
    }

    /// Bytes taken by `num` vertices.
    pub fn size(&self, num: u32) -> usize {
        num as usize * self.stride as usize
    }

    pub(crate) fn expect_ended(&self, op: &'static str) -> Result<()> {
        if self.phase == Phase::Ended {
            Ok(())
        } else {
            Err(RenderError::DeclState {
                op,
                phase: self.phase.describe(),
            })
        }
    }

    fn expect_building(&self, op: &'static str) -> Result<()> {
        if self.phase == Phase::Building {
            Ok(())
        } else {
            Err(RenderError::DeclState {
                op,
                phase: self.phase.describe(),
            })
        }
    }

    // FNV-1a over every attribute's encoding and offset, then the stride.
    fn compute_hash(&self) -> u32 {
        let mut hash: u32 = 0x811c_9dc5;
        let mut feed = |byte: u8| {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        };
        for (attrib, desc, offset) in self.attributes() {
            feed(attrib as u8);
            feed(((desc.num - 1) & 3) | ((desc.ty as u8) << 3) | ((desc.normalized as u8) << 6) | ((desc.as_int as u8) << 7));
            offset.to_le_bytes().into_iter().for_each(&mut feed);
        }
        self.stride.to_le_bytes().into_iter().for_each(&mut feed);
        hash
    }
}

/// A fixed-layout vertex record with a matching declaration.
///
/// Implementors must be `#[repr(C)]` with a size equal to the declaration's
/// stride; [`checked_decl`] verifies the size before any buffer is touched.
pub trait Vertex: Pod {
    fn decl() -> VertexDecl;
}

/// The declaration for `V`, verified against `size_of::<V>()`.
pub fn checked_decl<V: Vertex>() -> Result<VertexDecl> {
    let decl = V::decl();
    decl.expect_ended("checked_decl")?;
    let actual = std::mem::size_of::<V>();
    if actual != decl.stride() as usize {
        return Err(RenderError::StrideMismatch {
            expected: decl.stride() as usize,
            actual,
        });
    }
    Ok(decl)
}

/// Write up to four components for `attrib` of vertex `index`.
///
/// Normalized integer attributes take values in [0, 1] (Uint8) or [-1, 1]
/// (Int16); other integer attributes are saturated to the type's range.
pub fn vertex_pack(
    input: [f32; 4],
    attrib: Attrib,
    decl: &VertexDecl,
    data: &mut [u8],
    index: u32,
) -> Result<()> {
    let desc = decl.decode(attrib).ok_or(RenderError::MissingAttrib(attrib))?;
    let start = attrib_start(decl, attrib, index);
    let size = desc.ty.storage_size(desc.num) as usize;
    let len = data.len();
    let out = data
        .get_mut(start..start + size)
        .ok_or(RenderError::ConvertMismatch {
            what: "pack target",
            expected: start + size,
            actual: len,
        })?;

    for (i, value) in input.iter().take(desc.num as usize).enumerate() {
        match desc.ty {
            AttribType::Uint8 => {
                out[i] = if desc.normalized {
                    (value.clamp(0.0, 1.0) * 255.0).round() as u8
                } else {
                    value.clamp(0.0, 255.0) as u8
                };
            }
            AttribType::Int16 => {
                let v = if desc.normalized {
                    (value.clamp(-1.0, 1.0) * 32767.0).round() as i16
                } else {
                    value.clamp(i16::MIN as f32, i16::MAX as f32) as i16
                };
                out[i * 2..i * 2 + 2].copy_from_slice(&v.to_le_bytes());
            }
            AttribType::Half => {
                out[i * 2..i * 2 + 2].copy_from_slice(&f16::from_f32(*value).to_le_bytes());
            }
            AttribType::Float => {
                out[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
            }
        }
    }
    Ok(())
}

/// Read `attrib` of vertex `index`; missing components read as zero.
pub fn vertex_unpack(
    attrib: Attrib,
    decl: &VertexDecl,
    data: &[u8],
    index: u32,
) -> Result<[f32; 4]> {
    let desc = decl.decode(attrib).ok_or(RenderError::MissingAttrib(attrib))?;
    let start = attrib_start(decl, attrib, index);
    let size = desc.ty.storage_size(desc.num) as usize;
    let bytes = data
        .get(start..start + size)
        .ok_or(RenderError::ConvertMismatch {
            what: "unpack source",
            expected: start + size,
            actual: data.len(),
        })?;

    let mut output = [0.0f32; 4];
    for (i, slot) in output.iter_mut().take(desc.num as usize).enumerate() {
        *slot = match desc.ty {
            AttribType::Uint8 => {
                if desc.normalized {
                    bytes[i] as f32 / 255.0
                } else {
                    bytes[i] as f32
                }
            }
            AttribType::Int16 => {
                let v = i16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]) as f32;
                if desc.normalized {
                    (v / 32767.0).max(-1.0)
                } else {
                    v
                }
            }
            AttribType::Half => f16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]).to_f32(),
            AttribType::Float => f32::from_le_bytes([
                bytes[i * 4],
                bytes[i * 4 + 1],
                bytes[i * 4 + 2],
                bytes[i * 4 + 3],
            ]),
        };
    }
    Ok(output)
}

/// Re-encode `num` vertices from `src_decl` layout into `dst_decl` layout.
///
/// Only attributes present in both declarations are written; the rest of
/// `dst` is left as is. Buffer lengths must match the declared strides
/// exactly, otherwise nothing is written.
pub fn vertex_convert(
    dst_decl: &VertexDecl,
    dst: &mut [u8],
    src_decl: &VertexDecl,
    src: &[u8],
    num: u32,
) -> Result<()> {
    dst_decl.expect_ended("vertex_convert")?;
    src_decl.expect_ended("vertex_convert")?;
    if dst.len() != dst_decl.size(num) {
        return Err(RenderError::ConvertMismatch {
            what: "destination",
            expected: dst_decl.size(num),
            actual: dst.len(),
        });
    }
    if src.len() != src_decl.size(num) {
        return Err(RenderError::ConvertMismatch {
            what: "source",
            expected: src_decl.size(num),
            actual: src.len(),
        });
    }

    check_layout(dst_decl, "destination layout")?;
    check_layout(src_decl, "source layout")?;

    if dst_decl.hash() == src_decl.hash() && dst_decl.stride() == src_decl.stride() {
        dst.copy_from_slice(src);
        return Ok(());
    }

    let shared: Vec<Attrib> = dst_decl
        .attributes()
        .map(|(a, _, _)| a)
        .filter(|a| src_decl.has(*a))
        .collect();
    for index in 0..num {
        for &attrib in &shared {
            let value = vertex_unpack(attrib, src_decl, src, index)?;
            vertex_pack(value, attrib, dst_decl, dst, index)?;
        }
    }
    Ok(())
}

/// Every attribute must lie inside one vertex, or the last vertex of a
/// buffer would spill past its end after `set_offset`.
fn check_layout(decl: &VertexDecl, what: &'static str) -> Result<()> {
    for (_, desc, offset) in decl.attributes() {
        let end = offset as usize + desc.ty.storage_size(desc.num) as usize;
        if end > decl.stride() as usize {
            return Err(RenderError::ConvertMismatch {
                what,
                expected: end,
                actual: decl.stride() as usize,
            });
        }
    }
    Ok(())
}

fn attrib_start(decl: &VertexDecl, attrib: Attrib, index: u32) -> usize {
    index as usize * decl.stride() as usize + decl.offsets[attrib as usize] as usize
}
