//! Texture formats and storage size calculation

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Texture format ids. Values are a fixed contract shared with backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TextureFormat {
    BC1 = 0,
    BC2 = 1,
    BC3 = 2,
    BC4 = 3,
    BC5 = 4,
    BC6H = 5,
    BC7 = 6,
    ETC1 = 7,
    ETC2 = 8,
    ETC2A = 9,
    ETC2A1 = 10,
    PTC12 = 11,
    PTC14 = 12,
    PTC12A = 13,
    PTC14A = 14,
    PTC22 = 15,
    PTC24 = 16,
    /// Marker between compressed and plain color formats
    Unknown = 17,
    R1 = 18,
    R8 = 19,
    R16 = 20,
    R16F = 21,
    R32 = 22,
    R32F = 23,
    RG8 = 24,
    RG16 = 25,
    RG16F = 26,
    RG32 = 27,
    RG32F = 28,
    BGRA8 = 29,
    RGBA16 = 30,
    RGBA16F = 31,
    RGBA32 = 32,
    RGBA32F = 33,
    R5G6B5 = 34,
    RGBA4 = 35,
    RGB5A1 = 36,
    RGB10A2 = 37,
    R11G11B10F = 38,
    /// Marker between color and depth formats
    UnknownDepth = 39,
    D16 = 40,
    D24 = 41,
    D24S8 = 42,
    D32 = 43,
    D16F = 44,
    D24F = 45,
    D32F = 46,
    D0S8 = 47,
}

/// bits per pixel, block width, block height, block bytes, min blocks x, min blocks y
#[derive(Debug, Clone, Copy)]
struct BlockInfo {
    bpp: u8,
    block_width: u8,
    block_height: u8,
    block_size: u8,
    min_block_x: u8,
    min_block_y: u8,
}

const fn block(bpp: u8, bw: u8, bh: u8, size: u8, min_x: u8, min_y: u8) -> BlockInfo {
    BlockInfo {
        bpp,
        block_width: bw,
        block_height: bh,
        block_size: size,
        min_block_x: min_x,
        min_block_y: min_y,
    }
}

const fn pixel(bpp: u8) -> BlockInfo {
    block(bpp, 1, 1, bpp / 8, 1, 1)
}

const BLOCK_INFO: [BlockInfo; TextureFormat::COUNT] = [
    block(4, 4, 4, 8, 1, 1),  // BC1
    block(8, 4, 4, 16, 1, 1), // BC2
    block(8, 4, 4, 16, 1, 1), // BC3
    block(4, 4, 4, 8, 1, 1),  // BC4
    block(8, 4, 4, 16, 1, 1), // BC5
    block(8, 4, 4, 16, 1, 1), // BC6H
    block(8, 4, 4, 16, 1, 1), // BC7
    block(4, 4, 4, 8, 1, 1),  // ETC1
    block(4, 4, 4, 8, 1, 1),  // ETC2
    block(8, 4, 4, 16, 1, 1), // ETC2A
    block(4, 4, 4, 8, 1, 1),  // ETC2A1
    block(2, 8, 4, 8, 2, 2),  // PTC12
    block(4, 4, 4, 8, 2, 2),  // PTC14
    block(2, 8, 4, 8, 2, 2),  // PTC12A
    block(4, 4, 4, 8, 2, 2),  // PTC14A
    block(2, 8, 4, 8, 2, 2),  // PTC22
    block(4, 4, 4, 8, 2, 2),  // PTC24
    block(0, 0, 0, 0, 0, 0),  // Unknown
    block(1, 8, 1, 1, 1, 1),  // R1
    pixel(8),                 // R8
    pixel(16),                // R16
    pixel(16),                // R16F
    pixel(32),                // R32
    pixel(32),                // R32F
    pixel(16),                // RG8
    pixel(32),                // RG16
    pixel(32),                // RG16F
    pixel(64),                // RG32
    pixel(64),                // RG32F
    pixel(32),                // BGRA8
    pixel(64),                // RGBA16
    pixel(64),                // RGBA16F
    pixel(128),               // RGBA32
    pixel(128),               // RGBA32F
    pixel(16),                // R5G6B5
    pixel(16),                // RGBA4
    pixel(16),                // RGB5A1
    pixel(32),                // RGB10A2
    pixel(32),                // R11G11B10F
    block(0, 0, 0, 0, 0, 0),  // UnknownDepth
    pixel(16),                // D16
    pixel(32),                // D24
    pixel(32),                // D24S8
    pixel(32),                // D32
    pixel(16),                // D16F
    pixel(32),                // D24F
    pixel(32),                // D32F
    pixel(8),                 // D0S8
];

impl TextureFormat {
    pub const COUNT: usize = 48;

    pub const ALL: [TextureFormat; TextureFormat::COUNT] = {
        use TextureFormat::*;
        [
            BC1, BC2, BC3, BC4, BC5, BC6H, BC7, ETC1, ETC2, ETC2A, ETC2A1, PTC12, PTC14, PTC12A,
            PTC14A, PTC22, PTC24, Unknown, R1, R8, R16, R16F, R32, R32F, RG8, RG16, RG16F, RG32,
            RG32F, BGRA8, RGBA16, RGBA16F, RGBA32, RGBA32F, R5G6B5, RGBA4, RGB5A1, RGB10A2,
            R11G11B10F, UnknownDepth, D16, D24, D24S8, D32, D16F, D24F, D32F, D0S8,
        ]
    };

    fn info(self) -> BlockInfo {
        BLOCK_INFO[self as usize]
    }

    pub fn bits_per_pixel(self) -> u8 {
        self.info().bpp
    }

    /// Block size in bytes (bytes per pixel for uncompressed formats).
    pub fn block_size(self) -> u8 {
        self.info().block_size
    }

    pub fn is_compressed(self) -> bool {
        (self as u8) < (TextureFormat::Unknown as u8)
    }

    pub fn is_depth(self) -> bool {
        (self as u8) > (TextureFormat::UnknownDepth as u8)
    }

    /// Markers are not real formats and cannot back a texture.
    pub fn is_marker(self) -> bool {
        matches!(self, TextureFormat::Unknown | TextureFormat::UnknownDepth)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TextureFlags: u32 {
        const U_MIRROR = 0x0000_0001;
        const U_CLAMP = 0x0000_0002;
        const V_MIRROR = 0x0000_0004;
        const V_CLAMP = 0x0000_0008;
        const W_MIRROR = 0x0000_0010;
        const W_CLAMP = 0x0000_0020;
        const MIN_POINT = 0x0000_0040;
        const MIN_ANISOTROPIC = 0x0000_0080;
        const MAG_POINT = 0x0000_0100;
        const MAG_ANISOTROPIC = 0x0000_0200;
        const MIP_POINT = 0x0000_0400;
        const RT = 0x0000_1000;
        const RT_MSAA_X2 = 0x0000_2000;
        const RT_MSAA_X4 = 0x0000_3000;
        const RT_MSAA_X8 = 0x0000_4000;
        const RT_MSAA_X16 = 0x0000_5000;
        const RT_MSAA_MASK = 0x0000_7000;
        const RT_BUFFER_ONLY = 0x0000_8000;
        const COMPARE_LESS = 0x0001_0000;
        const COMPARE_LEQUAL = 0x0002_0000;
        const COMPUTE_WRITE = 0x0010_0000;
        const SRGB = 0x0020_0000;
    }
}

/// Storage description computed for a texture at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub format: TextureFormat,
    /// Bytes over all mips and faces. Wider than `u32`: a single
    /// 16384x16384 RGBA32F level is already 4 GiB.
    pub storage_size: u64,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub num_mips: u8,
    pub bits_per_pixel: u8,
    pub cubemap: bool,
}

/// Length of the full mip chain for the given dimensions.
pub fn full_mip_chain(width: u16, height: u16) -> u8 {
    let max = width.max(height).max(1);
    (u16::BITS - max.leading_zeros()) as u8
}

/// Compute storage for a 2D (or cube, six faces) texture.
///
/// `num_mips` of 0 or 1 means a single level; larger values are clamped to
/// the full chain.
pub fn calc_texture_size(
    width: u16,
    height: u16,
    depth: u16,
    cubemap: bool,
    num_mips: u8,
    format: TextureFormat,
) -> TextureInfo {
    let info = format.info();
    let num_mips = num_mips.clamp(1, full_mip_chain(width, height));
    let sides: u64 = if cubemap { 6 } else { 1 };

    let bw = info.block_width as u64;
    let bh = info.block_height as u64;
    let min_w = bw * info.min_block_x as u64;
    let min_h = bh * info.min_block_y as u64;

    let mut w = width.max(1) as u64;
    let mut h = height.max(1) as u64;
    let mut d = depth.max(1) as u64;
    let mut bits: u64 = 0;
    if bw > 0 && bh > 0 {
        for _ in 0..num_mips {
            let lw = min_w.max(w.div_ceil(bw) * bw);
            let lh = min_h.max(h.div_ceil(bh) * bh);
            bits += lw * lh * d * info.bpp as u64;
            w = (w >> 1).max(1);
            h = (h >> 1).max(1);
            d = (d >> 1).max(1);
        }
    }

    TextureInfo {
        format,
        storage_size: (bits * sides) / 8,
        width,
        height,
        depth: depth.max(1),
        num_mips,
        bits_per_pixel: info.bpp,
        cubemap,
    }
}
