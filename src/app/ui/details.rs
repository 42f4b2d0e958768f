use eframe::egui::{self, RichText, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Species Details");
        ui.add_space(6.0);

        let Some(node_id) = self.info_node.clone() else {
            ui.label("Double-click a species to inspect it.");
            return;
        };

        let scene = self.engine.scene();
        let Some(node) = scene.node(&node_id) else {
            ui.label("This species is no longer part of the tree.");
            return;
        };

        let degree = scene.degree(&node_id);
        let position = node.position;
        let attribute = node.attribute.clone();
        let cluster = node.cluster;
        let annotations = node.annotations.clone();

        ui.label(RichText::new(node_id.as_str()).strong());
        ui.add_space(6.0);
        ui.label(format!("Attribute: {attribute}"));
        ui.label(match cluster {
            Some(cluster) => format!("Cluster: {cluster}"),
            None => "Cluster: none".to_owned(),
        });
        ui.label(format!(
            "Position: ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        ));
        ui.label(format!("Connected species: {degree}"));

        ui.separator();
        ui.label(RichText::new("Annotations").strong());
        if annotations.is_empty() {
            ui.label("None yet. Right-click the species to add one.");
        } else {
            egui::ScrollArea::vertical()
                .id_salt("annotations_scroll")
                .max_height(240.0)
                .show(ui, |ui| {
                    for annotation in &annotations {
                        ui.label(format!("- {annotation}"));
                    }
                });
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Zoom to species").clicked() {
                self.zoom_to(&node_id);
            }
            if ui.button("Close").clicked() {
                self.info_node = None;
            }
        });
    }
}
