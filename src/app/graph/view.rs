use eframe::egui::{Sense, Ui};

use crate::engine::Viewport;

use super::super::ViewModel;
use super::super::canvas::PainterCanvas;

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.engine.set_viewport(Viewport::from_rect(rect));

        self.queue_graph_input(ui, &response);
        let interactions = self.engine.process_input();
        self.apply_interactions(interactions);

        let painter = ui.painter_at(rect);
        let mut canvas = PainterCanvas::new(&painter, rect, self.node_renderer.clone());
        if let Err(error) = self.engine.render(&mut canvas) {
            self.status = Some(error.to_string());
        }

        if self.engine.animator().is_active() {
            ui.ctx().request_repaint();
        }

        if let Some(hovered) = response
            .hover_pos()
            .and_then(|pos| self.engine.pick(pos))
        {
            response.on_hover_text(hovered);
        }
    }
}
