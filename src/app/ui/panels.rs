use eframe::egui::{self, Align, Context, Layout};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);
        self.collect_screenshot(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("evo-tree-viewer");
                    ui.separator();
                    ui.label(format!("data: {}", self.data_path.display()));
                    ui.label(format!("species: {}", self.engine.scene().node_count()));
                    ui.label(format!("edges: {}", self.engine.scene().edge_count()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if is_loading {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let status = self.status.as_deref().unwrap_or("Ready");
                    ui.label(status);
                    if self.status.is_some() && ui.small_button("Clear").clicked() {
                        self.status = None;
                    }
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));

        self.draw_context_menu(ctx);
    }
}
