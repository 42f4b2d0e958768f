use eframe::egui::{self, Context, Key};

use super::super::ViewModel;

enum MenuAction {
    Annotate(String),
    Delete,
    ZoomTo,
    Close,
}

impl ViewModel {
    /// Popup opened by right-clicking a species.
    pub(in crate::app) fn draw_context_menu(&mut self, ctx: &Context) {
        let Some(menu) = self.context_menu.as_ref() else {
            return;
        };
        let node = menu.node.clone();
        let at = menu.at;
        let mut action = None;

        egui::Area::new(egui::Id::new("species_context_menu"))
            .order(egui::Order::Foreground)
            .fixed_pos(at)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(240.0);
                    ui.label(egui::RichText::new(node.as_str()).strong());
                    ui.separator();

                    ui.label("Annotation");
                    let response = ui.text_edit_singleline(&mut self.annotation_draft);
                    let submitted =
                        response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
                    let draft = self.annotation_draft.trim();
                    if (ui.add_enabled(!draft.is_empty(), egui::Button::new("Add annotation")).clicked()
                        || submitted)
                        && !draft.is_empty()
                    {
                        action = Some(MenuAction::Annotate(draft.to_owned()));
                    }

                    if ui.button("Zoom to species").clicked() {
                        action = Some(MenuAction::ZoomTo);
                    }
                    if ui.button("Delete species").clicked() {
                        action = Some(MenuAction::Delete);
                    }
                    if ui.button("Close").clicked() || ui.input(|input| input.key_pressed(Key::Escape)) {
                        action = Some(MenuAction::Close);
                    }
                });
            });

        let Some(action) = action else {
            return;
        };
        self.context_menu = None;
        let result = match action {
            MenuAction::Annotate(text) => self.engine.annotate(&node, text),
            MenuAction::Delete => self.engine.delete_node(&node).map(|_| {
                if self.info_node.as_deref() == Some(node.as_str()) {
                    self.info_node = None;
                }
            }),
            MenuAction::ZoomTo => self.engine.zoom_to_node(&node),
            MenuAction::Close => Ok(()),
        };
        if let Err(error) = result {
            self.status = Some(error.to_string());
        }
        self.annotation_draft.clear();
    }
}
