// Demo 1: Hello World
//
// Goals:
// - Boot the recorder on the null backend
// - Clear view 0 every frame with touch()
// - Print debug text and read it back from the text grid
//
// Success Criteria:
// - View 0 cleared every frame with zero draws and zero primitives
// - Text grid sized for 1280x720 (160x45 cells)

use anyhow::Result;
use tessel_render::{
    dbg_text, text_attr, ClearFlags, DebugFlags, InitSettings, PlatformData, Renderer, ViewId,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let settings = InitSettings::default();
    let (width, height) = (settings.resolution.width, settings.resolution.height);
    let mut renderer = Renderer::init(settings, PlatformData::default())?;

    renderer.set_debug(DebugFlags::TEXT);
    renderer.set_view_clear(
        ViewId(0),
        ClearFlags::COLOR | ClearFlags::DEPTH,
        0x3030_30ff,
        1.0,
        0,
    );
    renderer.set_view_rect(ViewId(0), 0, 0, width as u16, height as u16);

    for _ in 0..3 {
        renderer.touch(ViewId(0))?;

        renderer.dbg_text_clear(0, false);
        dbg_text!(renderer, 0, 1, text_attr(0xf, 0x4), "tessel/helloworld");
        dbg_text!(renderer, 0, 2, 0x6f, "Description: Initialization and debug text.");
        let (columns, rows) = (renderer.text().columns(), renderer.text().rows());
        dbg_text!(renderer, 0, 4, 0x0f, "Text grid: {}x{} cells", columns, rows);

        renderer.frame()?;
    }

    let stats = renderer.stats();
    tracing::info!(
        "frame {}: {} draws, {} primitives",
        stats.frame,
        stats.num_draws,
        stats.num_primitives
    );
    tracing::info!("row 4: {}", renderer.text().row_text(4).trim_end());

    renderer.shutdown();
    Ok(())
}
