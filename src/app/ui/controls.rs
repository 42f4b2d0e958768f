use std::path::PathBuf;

use eframe::egui::{self, Context, Key, Rect, Ui, pos2, vec2};

use crate::engine::{FrameCapture, Payload, RowOrigin, SEARCH_NODE, UPDATE_LOD};

use super::super::ViewModel;

const ZOOM_STEP: f32 = 10.0;
const ROTATE_STEP_DEGREES: f32 = 5.0;
const LOD_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1000.0;
const AXIS_NAMES: [&str; 3] = ["X", "Y", "Z"];

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Tree Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search species")
            .on_hover_text("Highlights the best matching species.");
        let search_response = ui.text_edit_singleline(&mut self.search);
        let submitted =
            search_response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
        ui.horizontal(|ui| {
            if ui.button("Find").clicked() || submitted {
                self.publish_search();
            }
            let highlighted = self.engine.scene().highlighted().map(str::to_owned);
            if ui
                .add_enabled(highlighted.is_some(), egui::Button::new("Zoom to match"))
                .clicked()
            {
                if let Some(id) = highlighted {
                    self.zoom_to(&id);
                }
            }
            if ui.button("Clear").clicked() {
                self.search.clear();
                let _ = self.engine.select(None);
            }
        });

        ui.separator();
        ui.label("Camera");
        ui.horizontal(|ui| {
            if ui.button("Zoom in").clicked() {
                self.engine.update_zoom(ZOOM_STEP);
            }
            if ui.button("Zoom out").clicked() {
                self.engine.update_zoom(-ZOOM_STEP);
            }
            if ui.button("Reset view").clicked() {
                self.engine.reset_view();
            }
        });
        for (axis, name) in AXIS_NAMES.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(format!("Rotate {name}"));
                for (text, degrees) in [("-5°", -ROTATE_STEP_DEGREES), ("+5°", ROTATE_STEP_DEGREES)] {
                    if ui.button(text).clicked() {
                        if let Err(error) = self.engine.update_rotation(axis, degrees) {
                            self.status = Some(error.to_string());
                        }
                    }
                }
                ui.label(format!("{:.0}°", self.engine.camera().rotation[axis]));
            });
        }
        ui.small("Drag to rotate, right-drag or shift-drag to pan, scroll to zoom.");

        ui.separator();
        ui.label("Level of detail")
            .on_hover_text("Species farther than this from the camera are hidden.");
        let lod_response = ui.add(egui::Slider::new(&mut self.lod_threshold, LOD_RANGE).text("distance"));
        if lod_response.changed() {
            self.publish(UPDATE_LOD, Payload::Scalar(self.lod_threshold));
        }

        if ui.checkbox(&mut self.show_labels, "Show labels").changed() {
            self.engine.set_show_labels(self.show_labels);
        }
        ui.checkbox(&mut self.show_fps_bar, "Show FPS");

        ui.separator();
        ui.label("Screenshot");
        ui.text_edit_singleline(&mut self.screenshot_path);
        let pending = self.screenshot_pending.is_some();
        if ui
            .add_enabled(!pending, egui::Button::new("Save screenshot"))
            .clicked()
        {
            self.screenshot_pending = Some(PathBuf::from(self.screenshot_path.trim()));
            ui.ctx()
                .send_viewport_cmd(egui::ViewportCommand::Screenshot(Default::default()));
        }
    }

    /// Publishes on the engine bus. Returns whether every subscriber succeeded.
    fn publish(&mut self, topic: &str, payload: Payload) -> bool {
        let report = self.bus.publish(&mut self.engine, topic, &payload);
        if let Some(failure) = report.failures.first() {
            self.status = Some(failure.message.clone());
        }
        report.is_clean()
    }

    fn publish_search(&mut self) {
        let query = self.search.trim().to_owned();
        if query.is_empty() {
            return;
        }
        if !self.publish(SEARCH_NODE, Payload::Text(query)) {
            return;
        }
        if let Some(found) = self.engine.scene().highlighted() {
            self.info_node = Some(found.to_owned());
        }
    }

    pub(in crate::app) fn zoom_to(&mut self, id: &str) {
        if let Err(error) = self.engine.zoom_to_node(id) {
            self.status = Some(error.to_string());
        }
    }

    /// Saves the screenshot requested last frame once the viewport delivers it.
    pub(in crate::app) fn collect_screenshot(&mut self, ctx: &Context) {
        if self.screenshot_pending.is_none() {
            return;
        }
        let image = ctx.input(|input| {
            input.raw.events.iter().find_map(|event| match event {
                egui::Event::Screenshot { image, .. } => Some(image.clone()),
                _ => None,
            })
        });
        let Some(image) = image else {
            return;
        };
        let Some(path) = self.screenshot_pending.take() else {
            return;
        };

        let viewport = self.engine.viewport();
        let graph_rect = Rect::from_min_size(
            pos2(viewport.x, viewport.y),
            vec2(viewport.width, viewport.height),
        );
        let region = image.region(&graph_rect, Some(ctx.pixels_per_point()));
        let [width, height] = region.size;
        let rgba = region
            .pixels
            .iter()
            .flat_map(|pixel| pixel.to_array())
            .collect::<Vec<_>>();

        let saved = FrameCapture::new(width as u32, height as u32, rgba, RowOrigin::TopLeft)
            .and_then(|capture| self.engine.save_screenshot(capture, &path));
        self.status = Some(match saved {
            Ok(()) => format!("Saved {}", path.display()),
            Err(error) => error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use glam::Vec3;

    use crate::engine::{Engine, SceneNode};
    use crate::settings::Settings;

    use super::super::super::ViewModel;

    fn model() -> ViewModel {
        let mut engine = Engine::headless();
        engine
            .update_tree(
                vec![
                    SceneNode::new("Homo sapiens", Vec3::ZERO),
                    SceneNode::new("Pan troglodytes", Vec3::X),
                ],
                Vec::new(),
            )
            .unwrap();
        ViewModel::new(engine, None, PathBuf::from("species.csv"), &Settings::default())
    }

    #[test]
    fn search_hit_opens_the_details_panel() {
        let mut model = model();
        model.search = "troglo".to_owned();
        model.publish_search();
        assert_eq!(model.info_node.as_deref(), Some("Pan troglodytes"));
    }

    #[test]
    fn search_miss_leaves_the_details_panel_alone() {
        let mut model = model();
        model.search = "Homo".to_owned();
        model.publish_search();
        model.info_node = None;

        model.search = "Quercus".to_owned();
        model.publish_search();

        assert_eq!(model.info_node, None);
        assert_eq!(model.engine.scene().highlighted(), Some("Homo sapiens"));
        assert!(model.status.as_deref().is_some_and(|status| status.contains("Quercus")));
    }
}
