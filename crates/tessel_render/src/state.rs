//! Render state bitmask
//!
//! A single `u64` describes write masks, depth test, blending, culling,
//! primitive type and MSAA for one draw. The numeric layout is a fixed
//! contract; backends decode it field by field.

use bitflags::bitflags;

pub const DEPTH_TEST_SHIFT: u32 = 4;
pub const BLEND_SHIFT: u32 = 12;
pub const BLEND_EQUATION_SHIFT: u32 = 28;
pub const CULL_SHIFT: u32 = 36;
pub const ALPHA_REF_SHIFT: u32 = 40;
pub const PT_SHIFT: u32 = 48;
pub const POINT_SIZE_SHIFT: u32 = 52;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct State: u64 {
        const RGB_WRITE = 1 << 0;
        const ALPHA_WRITE = 1 << 1;
        const DEPTH_WRITE = 1 << 2;

        const DEPTH_TEST_LESS = 0x10;
        const DEPTH_TEST_LEQUAL = 0x20;
        const DEPTH_TEST_EQUAL = 0x30;
        const DEPTH_TEST_GEQUAL = 0x40;
        const DEPTH_TEST_GREATER = 0x50;
        const DEPTH_TEST_NOTEQUAL = 0x60;
        const DEPTH_TEST_NEVER = 0x70;
        const DEPTH_TEST_ALWAYS = 0x80;
        const DEPTH_TEST_MASK = 0xf0;

        const BLEND_ZERO = 0x1000;
        const BLEND_ONE = 0x2000;
        const BLEND_SRC_COLOR = 0x3000;
        const BLEND_INV_SRC_COLOR = 0x4000;
        const BLEND_SRC_ALPHA = 0x5000;
        const BLEND_INV_SRC_ALPHA = 0x6000;
        const BLEND_DST_ALPHA = 0x7000;
        const BLEND_INV_DST_ALPHA = 0x8000;
        const BLEND_DST_COLOR = 0x9000;
        const BLEND_INV_DST_COLOR = 0xa000;
        const BLEND_SRC_ALPHA_SAT = 0xb000;
        const BLEND_FACTOR = 0xc000;
        const BLEND_INV_FACTOR = 0xd000;
        const BLEND_MASK = 0x0000_0000_0fff_f000;

        const BLEND_EQUATION_SUB = 0x0000_0000_1000_0000;
        const BLEND_EQUATION_REVSUB = 0x0000_0000_2000_0000;
        const BLEND_EQUATION_MIN = 0x0000_0000_3000_0000;
        const BLEND_EQUATION_MAX = 0x0000_0000_4000_0000;
        const BLEND_EQUATION_MASK = 0x0000_0003_f000_0000;

        const CULL_CW = 0x0000_0010_0000_0000;
        const CULL_CCW = 0x0000_0020_0000_0000;
        const CULL_MASK = 0x0000_0030_0000_0000;

        const ALPHA_REF_MASK = 0x0000_ff00_0000_0000;

        const PT_TRISTRIP = 0x0001_0000_0000_0000;
        const PT_LINES = 0x0002_0000_0000_0000;
        const PT_LINESTRIP = 0x0003_0000_0000_0000;
        const PT_POINTS = 0x0004_0000_0000_0000;
        const PT_MASK = 0x0007_0000_0000_0000;

        const POINT_SIZE_MASK = 0x0ff0_0000_0000_0000;

        const MSAA = 0x1000_0000_0000_0000;

        const DEFAULT = Self::RGB_WRITE.bits()
            | Self::ALPHA_WRITE.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::DEPTH_TEST_LESS.bits()
            | Self::CULL_CW.bits()
            | Self::MSAA.bits();
    }
}

impl Default for State {
    fn default() -> Self {
        State::DEFAULT
    }
}

impl State {
    /// Separate color and alpha blend factors. Factors are the `BLEND_*`
    /// constants; each group of two lands in adjacent nibbles.
    pub const fn blend_func_separate(
        src_rgb: State,
        dst_rgb: State,
        src_a: State,
        dst_a: State,
    ) -> State {
        State::from_bits_retain(
            (src_rgb.bits() | (dst_rgb.bits() << 4))
                | ((src_a.bits() | (dst_a.bits() << 4)) << 8),
        )
    }

    pub const fn blend_func(src: State, dst: State) -> State {
        State::blend_func_separate(src, dst, src, dst)
    }

    pub const fn blend_equation_separate(rgb: State, alpha: State) -> State {
        State::from_bits_retain(rgb.bits() | (alpha.bits() << 3))
    }

    pub const fn blend_equation(eq: State) -> State {
        State::blend_equation_separate(eq, eq)
    }

    pub const fn blend_alpha() -> State {
        State::blend_func(State::BLEND_SRC_ALPHA, State::BLEND_INV_SRC_ALPHA)
    }

    pub const fn blend_add() -> State {
        State::blend_func(State::BLEND_ONE, State::BLEND_ONE)
    }

    pub const fn blend_normal() -> State {
        State::blend_func(State::BLEND_ONE, State::BLEND_INV_SRC_ALPHA)
    }

    pub const fn blend_multiply() -> State {
        State::blend_func(State::BLEND_DST_COLOR, State::BLEND_ZERO)
    }

    pub const fn blend_screen() -> State {
        State::blend_func(State::BLEND_ONE, State::BLEND_INV_SRC_COLOR)
    }

    pub const fn blend_darken() -> State {
        State::from_bits_retain(
            State::blend_add().bits() | State::blend_equation(State::BLEND_EQUATION_MIN).bits(),
        )
    }

    pub const fn blend_lighten() -> State {
        State::from_bits_retain(
            State::blend_add().bits() | State::blend_equation(State::BLEND_EQUATION_MAX).bits(),
        )
    }

    /// Alpha reference for alpha testing, 0..=255.
    pub const fn alpha_ref(value: u8) -> State {
        State::from_bits_retain((value as u64) << ALPHA_REF_SHIFT)
    }

    pub const fn point_size(value: u8) -> State {
        State::from_bits_retain(((value as u64) << POINT_SIZE_SHIFT) & State::POINT_SIZE_MASK.bits())
    }

    pub fn depth_test(self) -> State {
        self & State::DEPTH_TEST_MASK
    }

    pub fn blend(self) -> State {
        self & State::BLEND_MASK
    }

    pub fn cull(self) -> State {
        self & State::CULL_MASK
    }

    pub fn primitive(self) -> State {
        self & State::PT_MASK
    }

    pub fn has_blend(self) -> bool {
        !self.blend().is_empty()
    }
}
