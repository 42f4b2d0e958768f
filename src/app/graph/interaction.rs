use eframe::egui::{self, Response, Ui};

use crate::engine::input::WHEEL_DELTA_PER_NOTCH;
use crate::engine::{InputEvent, Interaction, Modifiers, PointerButton};

use super::super::{ContextMenuState, ViewModel};

/// Scroll distance egui reports for one mouse-wheel notch.
const POINTS_PER_WHEEL_NOTCH: f32 = 50.0;

fn pointer_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

impl ViewModel {
    /// Translates this frame's pointer activity over the graph into engine input.
    pub(in crate::app) fn queue_graph_input(&mut self, ui: &Ui, response: &Response) {
        let shift = ui.input(|input| input.modifiers.shift);

        for button in [
            egui::PointerButton::Primary,
            egui::PointerButton::Secondary,
            egui::PointerButton::Middle,
        ] {
            if !response.dragged_by(button) {
                continue;
            }
            let delta = response.drag_delta();
            if delta == egui::Vec2::ZERO {
                continue;
            }
            if let Some(button) = pointer_button(button) {
                self.engine.push_input(InputEvent::Drag {
                    button,
                    delta,
                    modifiers: Modifiers { shift },
                });
            }
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                self.engine.push_input(InputEvent::Wheel {
                    delta: scroll / POINTS_PER_WHEEL_NOTCH * WHEEL_DELTA_PER_NOTCH,
                });
            }
        }

        if let Some(pos) = response.interact_pointer_pos() {
            if response.double_clicked() {
                self.engine.push_input(InputEvent::DoubleClick { pos });
            } else if response.secondary_clicked() {
                self.engine.push_input(InputEvent::RightClick { pos });
            }
        }
    }

    pub(in crate::app) fn apply_interactions(&mut self, interactions: Vec<Interaction>) {
        for interaction in interactions {
            match interaction {
                Interaction::ShowInfo { node } => {
                    self.info_node = Some(node);
                }
                Interaction::ContextMenu { node, at } => {
                    self.annotation_draft.clear();
                    self.context_menu = Some(ContextMenuState { node, at });
                }
            }
        }
    }
}
