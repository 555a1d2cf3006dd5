//! View table
//!
//! 256 independently configured render passes. Configuration persists
//! across frames until overwritten or reset.

use crate::resource::FrameBufferHandle;
use bitflags::bitflags;
use glam::Mat4;

pub const MAX_VIEWS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ViewId(pub u8);

impl From<u8> for ViewId {
    fn from(id: u8) -> Self {
        ViewId(id)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClearFlags: u8 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// View size relative to the backbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackbufferRatio {
    Equal,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    Double,
}

impl BackbufferRatio {
    pub fn apply(self, width: u32, height: u32) -> (u16, u16) {
        let (w, h) = match self {
            BackbufferRatio::Equal => (width, height),
            BackbufferRatio::Half => (width / 2, height / 2),
            BackbufferRatio::Quarter => (width / 4, height / 4),
            BackbufferRatio::Eighth => (width / 8, height / 8),
            BackbufferRatio::Sixteenth => (width / 16, height / 16),
            BackbufferRatio::Double => (width * 2, height * 2),
        };
        let clamp = |v: u32| v.clamp(1, u16::MAX as u32) as u16;
        (clamp(w), clamp(h))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewClear {
    pub flags: ClearFlags,
    /// 0xRRGGBBAA
    pub rgba: u32,
    pub depth: f32,
    pub stencil: u8,
}

impl Default for ViewClear {
    fn default() -> Self {
        Self {
            flags: ClearFlags::empty(),
            rgba: 0x0000_00ff,
            depth: 1.0,
            stencil: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub name: Option<String>,
    pub rect: Rect,
    /// Set by `set_view_rect_auto`; the rect follows backbuffer resets
    pub ratio: Option<BackbufferRatio>,
    pub scissor: Rect,
    pub clear: ViewClear,
    pub view: Mat4,
    pub proj: Mat4,
    pub frame_buffer: Option<FrameBufferHandle>,
}

impl Default for View {
    fn default() -> Self {
        Self {
            name: None,
            rect: Rect::default(),
            ratio: None,
            scissor: Rect::default(),
            clear: ViewClear::default(),
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            frame_buffer: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewTable {
    views: Vec<View>,
}

impl ViewTable {
    pub fn new() -> Self {
        Self {
            views: vec![View::default(); MAX_VIEWS],
        }
    }

    pub fn get(&self, id: ViewId) -> &View {
        &self.views[id.0 as usize]
    }

    fn get_mut(&mut self, id: ViewId) -> &mut View {
        &mut self.views[id.0 as usize]
    }

    pub fn set_name(&mut self, id: ViewId, name: &str) {
        self.get_mut(id).name = Some(name.to_string());
    }

    pub fn set_rect(&mut self, id: ViewId, rect: Rect) {
        let view = self.get_mut(id);
        view.rect = rect;
        view.ratio = None;
    }

    pub fn set_rect_auto(
        &mut self,
        id: ViewId,
        x: u16,
        y: u16,
        ratio: BackbufferRatio,
        backbuffer: (u32, u32),
    ) {
        let (width, height) = ratio.apply(backbuffer.0, backbuffer.1);
        let view = self.get_mut(id);
        view.rect = Rect::new(x, y, width, height);
        view.ratio = Some(ratio);
    }

    pub fn set_scissor(&mut self, id: ViewId, rect: Rect) {
        self.get_mut(id).scissor = rect;
    }

    pub fn set_clear(&mut self, id: ViewId, clear: ViewClear) {
        self.get_mut(id).clear = clear;
    }

    pub fn set_transform(&mut self, id: ViewId, view: Mat4, proj: Mat4) {
        let v = self.get_mut(id);
        v.view = view;
        v.proj = proj;
    }

    pub fn set_frame_buffer(&mut self, id: ViewId, fb: Option<FrameBufferHandle>) {
        self.get_mut(id).frame_buffer = fb;
    }

    pub fn reset(&mut self, id: ViewId) {
        *self.get_mut(id) = View::default();
    }

    /// Detach a destroyed frame buffer from every view that targets it.
    pub fn detach_frame_buffer(&mut self, fb: FrameBufferHandle) -> usize {
        let mut detached = 0;
        for view in self.views.iter_mut().filter(|v| v.frame_buffer == Some(fb)) {
            view.frame_buffer = None;
            detached += 1;
        }
        detached
    }

    /// Re-apply backbuffer ratios after a reset.
    pub fn resize_auto(&mut self, backbuffer: (u32, u32)) {
        for view in &mut self.views {
            if let Some(ratio) = view.ratio {
                let (width, height) = ratio.apply(backbuffer.0, backbuffer.1);
                view.rect.width = width;
                view.rect.height = height;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViewId, &View)> {
        self.views
            .iter()
            .enumerate()
            .map(|(i, v)| (ViewId(i as u8), v))
    }
}

impl Default for ViewTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn clear_flag_values() {
        assert_eq!(ClearFlags::COLOR.bits(), 1);
        assert_eq!(ClearFlags::DEPTH.bits(), 2);
        assert_eq!(ClearFlags::STENCIL.bits(), 4);
    }

    #[test]
    fn every_view_starts_disabled() {
        let table = ViewTable::new();
        assert_eq!(table.iter().count(), MAX_VIEWS);
        let last = table.get(ViewId(255));
        assert!(last.rect.is_empty());
        assert!(last.clear.flags.is_empty());
        assert!(last.frame_buffer.is_none());
    }

    #[test]
    fn views_are_independent() {
        let mut table = ViewTable::new();
        table.set_rect(ViewId(0), Rect::new(0, 0, 1280, 720));
        table.set_clear(
            ViewId(1),
            ViewClear {
                flags: ClearFlags::COLOR | ClearFlags::DEPTH,
                rgba: 0x3030_30ff,
                depth: 1.0,
                stencil: 0,
            },
        );
        let view = Mat4::look_at_lh(Vec3::new(0.0, 0.0, -35.0), Vec3::ZERO, Vec3::Y);
        table.set_transform(ViewId(0), view, Mat4::IDENTITY);

        assert_eq!(table.get(ViewId(0)).rect.width, 1280);
        assert_eq!(table.get(ViewId(0)).view, view);
        assert!(table.get(ViewId(0)).clear.flags.is_empty());
        assert!(table.get(ViewId(1)).rect.is_empty());
        assert_eq!(table.get(ViewId(1)).clear.rgba, 0x3030_30ff);

        table.reset(ViewId(0));
        assert_eq!(table.get(ViewId(0)), &View::default());
    }

    #[test]
    fn auto_rect_follows_backbuffer() {
        let mut table = ViewTable::new();
        table.set_rect_auto(ViewId(2), 0, 0, BackbufferRatio::Half, (1280, 720));
        assert_eq!(table.get(ViewId(2)).rect, Rect::new(0, 0, 640, 360));

        table.resize_auto((800, 600));
        assert_eq!(table.get(ViewId(2)).rect, Rect::new(0, 0, 400, 300));

        // A manual rect drops the ratio
        table.set_rect(ViewId(2), Rect::new(0, 0, 10, 10));
        table.resize_auto((1920, 1080));
        assert_eq!(table.get(ViewId(2)).rect, Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn ratio_never_collapses_to_zero() {
        assert_eq!(BackbufferRatio::Sixteenth.apply(8, 8), (1, 1));
    }
}
