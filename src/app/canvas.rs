use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Mesh, Painter, Rect, Shape, Stroke, vec2};
use eframe::egui_glow;

use crate::engine::palette::blend_color;
use crate::engine::{Canvas, NodeBatch, ScreenPoint, Viewport};

use super::node_renderer::{NodeDraw, NodeRenderer};

/// Draws engine frames with the egui painter of the graph area.
///
/// Nodes go through a GL paint callback reading the node vertex buffer when a
/// renderer is available, and fall back to painter circles otherwise. The
/// painter has no depth buffer; occlusion comes from the engine's
/// back-to-front node order.
pub(super) struct PainterCanvas<'a> {
    painter: &'a Painter,
    rect: Rect,
    renderer: Option<Arc<NodeRenderer>>,
}

impl<'a> PainterCanvas<'a> {
    pub(super) fn new(painter: &'a Painter, rect: Rect, renderer: Option<Arc<NodeRenderer>>) -> Self {
        Self {
            painter,
            rect,
            renderer,
        }
    }

    fn fallback_nodes(&self, batch: &NodeBatch<'_>) {
        for run in batch.runs {
            let radius = run.diameter * 0.5;
            let rim = Stroke::new(1.0, blend_color(run.color, Color32::BLACK, 0.35));
            for point in &run.points {
                self.painter.circle_filled(point.pos, radius, run.color);
                self.painter.circle_stroke(point.pos, radius, rim);
            }
        }
    }
}

impl Canvas for PainterCanvas<'_> {
    fn viewport(&self) -> Viewport {
        Viewport::from_rect(self.rect)
    }

    fn clear(&mut self, color: Color32) {
        self.painter.rect_filled(self.rect, 0.0, color);
    }

    fn set_depth_test(&mut self, _enabled: bool) {}

    fn vertical_gradient(&mut self, top: Color32, bottom: Color32) {
        let mut mesh = Mesh::default();
        mesh.colored_vertex(self.rect.left_top(), top);
        mesh.colored_vertex(self.rect.right_top(), top);
        mesh.colored_vertex(self.rect.right_bottom(), bottom);
        mesh.colored_vertex(self.rect.left_bottom(), bottom);
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        self.painter.add(Shape::mesh(mesh));
    }

    fn line(&mut self, from: ScreenPoint, to: ScreenPoint, width: f32, color: Color32) {
        self.painter
            .line_segment([from.pos, to.pos], Stroke::new(width, color));
    }

    fn nodes(&mut self, batch: &NodeBatch<'_>) {
        let (Some(renderer), Some(draw)) = (self.renderer.clone(), NodeDraw::from_batch(batch)) else {
            self.fallback_nodes(batch);
            return;
        };

        let callback = egui_glow::CallbackFn::new(move |info, painter| {
            renderer.paint(painter.gl(), &draw, info.pixels_per_point);
        });
        self.painter.add(egui::PaintCallback {
            rect: self.rect,
            callback: Arc::new(callback),
        });
    }

    fn label(&mut self, at: ScreenPoint, text: &str, color: Color32) {
        self.painter.text(
            at.pos + vec2(7.0, -7.0),
            Align2::LEFT_BOTTOM,
            text,
            FontId::proportional(12.0),
            color,
        );
    }
}
