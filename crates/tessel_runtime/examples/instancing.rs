// Demo 2: Instancing
//
// Goals:
// - One static cube mesh, 121 instances per frame
// - Per-instance transform + color streamed through an InstanceDataBuffer
// - Degrade gracefully when the backend lacks instancing
//
// Success Criteria:
// - A single draw per frame covering 121 instances
// - Instance ring usage of 121 * 80 bytes per frame

use std::io::Write;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tessel_render::{
    checked_decl, dbg_text, Attrib, AttribType, CapFlags, ClearFlags, InitSettings, PlatformData,
    Renderer, State, Vertex, VertexDecl, ViewId,
};

const GRID: u32 = 11;
/// Mat4 plus an RGBA color
const INSTANCE_STRIDE: u16 = 80;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PosColorVertex {
    pos: [f32; 3],
    abgr: u32,
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
    PosColorVertex { pos: [x, y, z], abgr }
}

const CUBE_VERTICES: [PosColorVertex; 8] = [
    v(-1.0, 1.0, 1.0, 0xff00_0000),
    v(1.0, 1.0, 1.0, 0xff00_00ff),
    v(-1.0, -1.0, 1.0, 0xff00_ff00),
    v(1.0, -1.0, 1.0, 0xff00_ffff),
    v(-1.0, 1.0, -1.0, 0xffff_0000),
    v(1.0, 1.0, -1.0, 0xffff_00ff),
    v(-1.0, -1.0, -1.0, 0xffff_ff00),
    v(1.0, -1.0, -1.0, 0xffff_ffff),
];

const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 1, 3, 2, 4, 6, 5, 5, 6, 7, 0, 2, 4, 4, 2, 6, //
    1, 5, 3, 5, 7, 3, 0, 4, 1, 4, 5, 1, 2, 3, 6, 6, 3, 7, //
];

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut renderer = Renderer::init(InitSettings::default(), PlatformData::default())?;
    let (width, height) = renderer.backbuffer_size();
    renderer.set_view_clear(
        ViewId(0),
        ClearFlags::COLOR | ClearFlags::DEPTH,
        0x3030_30ff,
        1.0,
        0,
    );
    renderer.set_view_rect(ViewId(0), 0, 0, width as u16, height as u16);

    // An unfinished declaration surfaces here rather than at first use
    checked_decl::<PosColorVertex>()?;
    let vb = renderer.create_vertex_buffer_from(&CUBE_VERTICES)?;
    let ib = renderer.create_index_buffer(&CUBE_INDICES)?;
    let vs = renderer.create_shader(b"VSH\x01")?;
    let fs = renderer.create_shader(b"FSH\x01")?;
    let program = renderer.create_program(vs, fs, true)?;

    let view = Mat4::look_at_lh(Vec3::new(0.0, 0.0, -35.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_lh(60f32.to_radians(), width as f32 / height as f32, 0.1, 100.0);
    renderer.set_view_transform(ViewId(0), &view, &proj);

    for frame in 0..60u32 {
        let t = frame as f32 / 60.0;
        renderer.touch(ViewId(0))?;
        renderer.dbg_text_clear(0, false);
        dbg_text!(renderer, 0, 1, 0x4f, "tessel/instancing");

        if !renderer.caps().supports(CapFlags::INSTANCING) {
            dbg_text!(renderer, 0, 3, 0x1f, " Instancing is not supported by GPU. ");
            renderer.frame()?;
            continue;
        }

        let mut idb = renderer.alloc_instance_data_buffer(GRID * GRID, INSTANCE_STRIDE)?;
        for yy in 0..GRID {
            for xx in 0..GRID {
                let mtx = Mat4::from_rotation_x(t + xx as f32 * 0.21)
                    * Mat4::from_rotation_y(t + yy as f32 * 0.37);
                let mtx = Mat4::from_translation(Vec3::new(
                    -15.0 + xx as f32 * 3.0,
                    -15.0 + yy as f32 * 3.0,
                    0.0,
                )) * mtx;
                let color = [
                    (t + xx as f32 / 11.0).sin() * 0.5 + 0.5,
                    (t + yy as f32 / 11.0).cos() * 0.5 + 0.5,
                    t.sin() * 0.5 + 0.5,
                    1.0f32,
                ];
                idb.write_all(bytemuck::bytes_of(&mtx))?;
                idb.write_all(bytemuck::bytes_of(&color))?;
            }
        }

        renderer.set_vertex_buffer(vb, 0, u32::MAX)?;
        renderer.set_index_buffer(ib, 0, u32::MAX)?;
        renderer.set_instance_data_buffer(&idb, idb.num())?;
        renderer.set_program(program)?;
        renderer.set_state(State::DEFAULT, 0);
        renderer.submit(ViewId(0), 0)?;

        renderer.frame()?;
    }

    let stats = renderer.stats();
    tracing::info!(
        "frame {}: {} draws, {} instances, {} instance bytes",
        stats.frame,
        stats.num_draws,
        stats.num_instances,
        stats.transient.instance_bytes
    );

    renderer.destroy_program(program)?;
    renderer.destroy_index_buffer(ib)?;
    renderer.destroy_vertex_buffer(vb)?;
    renderer.shutdown();
    Ok(())
}
