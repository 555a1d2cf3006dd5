//! Encoded frame and per-frame statistics

use crate::debug::{DebugFlags, TextBuffer};
use crate::draw::{RenderDraw, UniformBuffer};
use crate::registry::ResourceCounts;
use crate::settings::ResetFlags;
use crate::state::State;
use crate::transient::TransientUsage;
use crate::view::{ViewId, ViewTable};
use glam::Mat4;

/// Everything a backend needs to render one frame.
///
/// Draws are sorted by view, then by submission order. Transient slices
/// hold only the bytes written this frame.
pub struct FrameData<'a> {
    pub frame: u32,
    pub width: u32,
    pub height: u32,
    pub reset: ResetFlags,
    pub debug: DebugFlags,
    pub views: &'a ViewTable,
    pub draws: &'a [RenderDraw],
    pub uniforms: &'a UniformBuffer,
    pub transforms: &'a [Mat4],
    pub transient_vertices: &'a [u8],
    pub transient_indices: &'a [u8],
    pub instance_data: &'a [u8],
    /// Present when `DebugFlags::TEXT` is set
    pub text: Option<&'a TextBuffer>,
}

impl FrameData<'_> {
    /// Draws submitted to `view`.
    pub fn view_draws(&self, view: ViewId) -> &[RenderDraw] {
        let start = self.draws.partition_point(|d| d.view < view);
        let end = self.draws.partition_point(|d| d.view <= view);
        &self.draws[start..end]
    }
}

/// Primitives a draw of `count` vertices or indices produces.
pub fn primitive_count(state: State, count: u32) -> u32 {
    let primitive = state.primitive();
    if primitive == State::PT_TRISTRIP {
        count.saturating_sub(2)
    } else if primitive == State::PT_LINES {
        count / 2
    } else if primitive == State::PT_LINESTRIP {
        count.saturating_sub(1)
    } else if primitive == State::PT_POINTS {
        count
    } else {
        count / 3
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    /// Frame these stats describe
    pub frame: u32,
    pub num_draws: u32,
    /// Views touched or drawn to, with their draw counts
    pub view_draws: Vec<(ViewId, u32)>,
    pub num_primitives: u64,
    pub num_instances: u64,
    pub transient: TransientUsage,
    pub transient_peak: TransientUsage,
    pub uniform_floats: usize,
    pub transforms: usize,
    pub resources: ResourceCounts,
    /// Draws and primitives since init. Zero without the `metrics` feature.
    pub total_draws: u64,
    pub total_primitives: u64,
    pub cpu_time_ms: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl Stats {
    /// Count draws and primitives for a sorted draw list.
    pub(crate) fn count_draws(&mut self, draws: &[RenderDraw]) {
        self.num_draws = 0;
        self.num_primitives = 0;
        self.num_instances = 0;
        self.view_draws.clear();

        for draw in draws {
            match self.view_draws.last_mut() {
                Some((view, count)) if *view == draw.view => *count += !draw.is_touch() as u32,
                _ => self.view_draws.push((draw.view, !draw.is_touch() as u32)),
            }
            if draw.is_touch() {
                continue;
            }
            self.num_draws += 1;

            let count = match (draw.draw.index, draw.draw.vertex) {
                (Some(index), _) => index.num_indices(),
                (None, Some(vertex)) => vertex.num_vertices(),
                (None, None) => 0,
            };
            let instances = draw.draw.num_instances() as u64;
            self.num_instances += instances;
            self.num_primitives += primitive_count(draw.draw.state, count) as u64 * instances;
        }
    }

    pub fn draws_in_view(&self, view: ViewId) -> u32 {
        self.view_draws
            .iter()
            .find(|(v, _)| *v == view)
            .map_or(0, |(_, count)| *count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawState, IndexSource, VertexSource};
    use crate::resource::ProgramHandle;
    use crate::transient::InstanceBinding;

    fn draw(view: u8, sequence: u32, program: bool) -> RenderDraw {
        let mut state = DrawState::default();
        if program {
            state.program = Some(ProgramHandle::from_bits(0));
            state.vertex = Some(VertexSource::Transient {
                base_vertex: 0,
                num: 8,
                stride: 16,
            });
            state.index = Some(IndexSource::Transient { first: 0, num: 36 });
        }
        RenderDraw {
            view: ViewId(view),
            depth: 0,
            sequence,
            draw: state,
            uniforms: 0..0,
        }
    }

    #[test]
    fn primitive_counts() {
        assert_eq!(primitive_count(State::DEFAULT, 36), 12);
        assert_eq!(primitive_count(State::PT_TRISTRIP, 14), 12);
        assert_eq!(primitive_count(State::PT_LINES, 10), 5);
        assert_eq!(primitive_count(State::PT_LINESTRIP, 10), 9);
        assert_eq!(primitive_count(State::PT_POINTS, 10), 10);
        assert_eq!(primitive_count(State::PT_TRISTRIP, 1), 0);
    }

    #[test]
    fn counts_draws_per_view() {
        let mut instanced = draw(1, 2, true);
        instanced.draw.instances = Some(InstanceBinding {
            offset: 0,
            stride: 80,
            num: 121,
        });
        let draws = vec![draw(0, 0, false), draw(1, 1, true), instanced];

        let mut stats = Stats::default();
        stats.count_draws(&draws);
        assert_eq!(stats.num_draws, 2);
        assert_eq!(stats.view_draws, vec![(ViewId(0), 0), (ViewId(1), 2)]);
        assert_eq!(stats.draws_in_view(ViewId(1)), 2);
        assert_eq!(stats.draws_in_view(ViewId(7)), 0);
        assert_eq!(stats.num_instances, 122);
        assert_eq!(stats.num_primitives, 12 * 122);
    }

    #[test]
    fn view_draws_slices_sorted_list() {
        let views = ViewTable::new();
        let uniforms = UniformBuffer::new(0);
        let draws = vec![draw(0, 0, true), draw(2, 1, true), draw(2, 2, true)];
        let frame = FrameData {
            frame: 0,
            width: 1280,
            height: 720,
            reset: ResetFlags::empty(),
            debug: DebugFlags::empty(),
            views: &views,
            draws: &draws,
            uniforms: &uniforms,
            transforms: &[],
            transient_vertices: &[],
            transient_indices: &[],
            instance_data: &[],
            text: None,
        };
        assert_eq!(frame.view_draws(ViewId(2)).len(), 2);
        assert!(frame.view_draws(ViewId(1)).is_empty());
    }
}
