use std::collections::VecDeque;

use eframe::egui::Context;

use super::super::ViewModel;

const FPS_SAMPLE_WINDOW: usize = 180;
const FPS_CEILING: f32 = 1000.0;

/// Rolling frame-rate readout over the last few seconds of frames.
#[derive(Default)]
pub(in crate::app) struct FpsCounter {
    current: f32,
    samples: VecDeque<f32>,
}

impl FpsCounter {
    fn record(&mut self, frame_seconds: f32) {
        if frame_seconds <= f32::EPSILON {
            return;
        }
        self.current = (1.0 / frame_seconds).min(FPS_CEILING);
        if self.samples.len() == FPS_SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(self.current);
    }

    fn average(&self) -> Option<f32> {
        (!self.samples.is_empty())
            .then(|| self.samples.iter().sum::<f32>() / self.samples.len() as f32)
    }

    fn summary(&self) -> String {
        let mut text = format!("FPS {:.0}", self.current);
        if let Some(average) = self.average() {
            text.push_str(&format!(" | avg {average:.1}"));
        }
        if self.current > f32::EPSILON {
            text.push_str(&format!(" | {:.1} ms", 1000.0 / self.current));
        }
        text
    }
}

impl ViewModel {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        self.fps.record(ctx.input(|input| input.stable_dt));
    }

    pub(in crate::app) fn fps_display_text(&self) -> Option<String> {
        self.show_fps_bar.then(|| self.fps.summary())
    }

    pub(in crate::app) fn visible_graph_text(&self) -> String {
        let stats = self.engine.last_stats();
        format!(
            "in view: {} / {} species, {} edges",
            stats.visible_nodes,
            self.engine.scene().node_count(),
            stats.drawn_edges
        )
    }
}
