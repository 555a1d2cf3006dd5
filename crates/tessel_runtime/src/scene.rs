//! Spinning cube grid used by the smoke loop

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tessel_asset::{AssetError, AssetLoader};
use tessel_render::{
    dbg_text, Attrib, AttribType, IndexBufferHandle, ProgramHandle, Renderer, RendererType,
    ShaderHandle, State, VertexBufferHandle, Vertex, VertexDecl, ViewId,
};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PosColorVertex {
    pub pos: [f32; 3],
    pub abgr: u32,
}

impl Vertex for PosColorVertex {
    fn decl() -> VertexDecl {
        let mut decl = VertexDecl::new();
        if let Err(err) = decl
            .begin()
            .add(Attrib::Position, 3, AttribType::Float, false, false)
            .and_then(|d| d.add(Attrib::Color0, 4, AttribType::Uint8, true, false))
            .and_then(|d| d.end())
        {
            tracing::error!("PosColorVertex declaration: {err}");
        }
        decl
    }
}

const fn v(x: f32, y: f32, z: f32, abgr: u32) -> PosColorVertex {
    PosColorVertex {
        pos: [x, y, z],
        abgr,
    }
}

pub const CUBE_VERTICES: [PosColorVertex; 8] = [
    v(-1.0, 1.0, 1.0, 0xff00_0000),
    v(1.0, 1.0, 1.0, 0xff00_00ff),
    v(-1.0, -1.0, 1.0, 0xff00_ff00),
    v(1.0, -1.0, 1.0, 0xff00_ffff),
    v(-1.0, 1.0, -1.0, 0xffff_0000),
    v(1.0, 1.0, -1.0, 0xffff_00ff),
    v(-1.0, -1.0, -1.0, 0xffff_ff00),
    v(1.0, -1.0, -1.0, 0xffff_ffff),
];

pub const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 1, 3, 2, //
    4, 6, 5, 5, 6, 7, //
    0, 2, 4, 4, 2, 6, //
    1, 5, 3, 5, 7, 3, //
    0, 4, 1, 4, 5, 1, //
    2, 3, 6, 6, 3, 7, //
];

/// Load a shader, or stand in a stub binary when the null backend has no
/// compiled shaders to read.
fn load_shader(renderer: &mut Renderer, loader: &AssetLoader, name: &str) -> Result<ShaderHandle> {
    match loader.load_shader(renderer.renderer_type(), name) {
        Ok(data) => Ok(renderer.create_shader(&data)?),
        Err(AssetError::NotFound { path, .. }) if renderer.renderer_type() == RendererType::Null => {
            tracing::warn!("{} not found, using a stub shader", path.display());
            let magic: &[u8] = if name.starts_with("vs_") { b"VSH\x01" } else { b"FSH\x01" };
            Ok(renderer.create_shader(magic)?)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn load_program(
    renderer: &mut Renderer,
    loader: &AssetLoader,
    vs: &str,
    fs: &str,
) -> Result<ProgramHandle> {
    let vs = load_shader(renderer, loader, vs)?;
    let fs = load_shader(renderer, loader, fs)?;
    Ok(renderer.create_program(vs, fs, true)?)
}

pub struct Cubes {
    vb: VertexBufferHandle,
    ib: IndexBufferHandle,
    program: ProgramHandle,
    decl: VertexDecl,
    skipped: u32,
}

impl Cubes {
    pub fn new(renderer: &mut Renderer, loader: &AssetLoader) -> Result<Self> {
        let vb = renderer.create_vertex_buffer_from(&CUBE_VERTICES)?;
        let ib = renderer.create_index_buffer(&CUBE_INDICES)?;
        let program = load_program(renderer, loader, "vs_cubes", "fs_cubes")?;
        Ok(Self {
            vb,
            ib,
            program,
            decl: tessel_render::checked_decl::<PosColorVertex>()?,
            skipped: 0,
        })
    }

    /// Record one frame at time `t` (seconds).
    pub fn update(&mut self, renderer: &mut Renderer, t: f32, frame_ms: f64) -> Result<()> {
        let (width, height) = renderer.backbuffer_size();
        let view = Mat4::look_at_lh(Vec3::new(0.0, 0.0, -35.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_lh(
            60f32.to_radians(),
            width as f32 / height.max(1) as f32,
            0.1,
            100.0,
        );
        renderer.set_view_transform(ViewId(0), &view, &proj);
        renderer.set_view_rect(ViewId(0), 0, 0, width as u16, height as u16);

        renderer.dbg_text_clear(0, false);
        dbg_text!(renderer, 0, 1, 0x4f, "tessel/cubes");
        dbg_text!(renderer, 0, 2, 0x6f, "Description: Rendering simple static mesh.");
        dbg_text!(renderer, 0, 3, 0x0f, "Frame: {:7.3}[ms]", frame_ms);

        // Clear the view even if nothing below lands in it
        renderer.touch(ViewId(0))?;

        for yy in 0..11 {
            for xx in 0..11 {
                let mtx = Mat4::from_translation(Vec3::new(
                    -15.0 + xx as f32 * 3.0,
                    -15.0 + yy as f32 * 3.0,
                    0.0,
                )) * Mat4::from_rotation_x(t + xx as f32 * 0.21)
                    * Mat4::from_rotation_y(t + yy as f32 * 0.37);

                renderer.set_transform(&mtx);
                renderer.set_vertex_buffer(self.vb, 0, u32::MAX)?;
                renderer.set_index_buffer(self.ib, 0, u32::MAX)?;
                renderer.set_program(self.program)?;
                renderer.set_state(State::DEFAULT, 0);
                renderer.submit(ViewId(0), 0)?;
            }
        }

        // One more cube streamed through the transient rings
        match renderer.alloc_transient_buffers(&self.decl, 8, 36) {
            Some((tvb, tib)) => {
                renderer
                    .transient_vertices_mut::<PosColorVertex>(&tvb)?
                    .copy_from_slice(&CUBE_VERTICES);
                renderer
                    .transient_indices_mut(&tib)?
                    .copy_from_slice(&CUBE_INDICES);
                renderer.set_transform(&Mat4::from_scale(Vec3::splat(4.0)));
                renderer.set_transient_vertex_buffer(&tvb)?;
                renderer.set_transient_index_buffer(&tib)?;
                renderer.set_program(self.program)?;
                renderer.set_state(State::DEFAULT | State::blend_alpha(), 0);
                renderer.submit(ViewId(0), 1)?;
            }
            None => self.skipped += 1,
        }
        Ok(())
    }

    /// Frames whose transient cube did not fit.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn destroy(self, renderer: &mut Renderer) -> Result<()> {
        renderer.destroy_program(self.program)?;
        renderer.destroy_index_buffer(self.ib)?;
        renderer.destroy_vertex_buffer(self.vb)?;
        Ok(())
    }
}
