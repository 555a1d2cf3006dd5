//! Resource kinds and their typed handles

use tessel_core::{Handle, ResourceKind};

macro_rules! resource_kinds {
    ($($kind:ident => $alias:ident),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub enum $kind {}

            impl ResourceKind for $kind {
                const NAME: &'static str = stringify!($kind);
            }

            pub type $alias = Handle<$kind>;
        )*
    };
}

resource_kinds! {
    VertexBuffer => VertexBufferHandle,
    IndexBuffer => IndexBufferHandle,
    Shader => ShaderHandle,
    Program => ProgramHandle,
    Texture => TextureHandle,
    FrameBuffer => FrameBufferHandle,
    Uniform => UniformHandle,
}

/// Uniform value type. Values are a fixed contract shared with backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UniformType {
    /// Sampler slot / integer
    Int1 = 0,
    End = 1,
    Vec4 = 2,
    Mat3 = 3,
    Mat4 = 4,
}

impl UniformType {
    /// Number of `f32` slots one element occupies.
    pub fn floats(self) -> usize {
        match self {
            UniformType::Int1 => 1,
            UniformType::End => 0,
            UniformType::Vec4 => 4,
            UniformType::Mat3 => 9,
            UniformType::Mat4 => 16,
        }
    }
}

/// Pipeline stage a shader binary was compiled for, read from its magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    /// No recognised magic; the binary is passed through untouched
    Unknown,
}

impl ShaderStage {
    pub fn from_magic(data: &[u8]) -> Self {
        match data.get(..3) {
            Some(b"VSH") => ShaderStage::Vertex,
            Some(b"FSH") => ShaderStage::Fragment,
            Some(b"CSH") => ShaderStage::Compute,
            _ => ShaderStage::Unknown,
        }
    }
}
