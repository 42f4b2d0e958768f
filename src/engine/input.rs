use std::collections::VecDeque;

use eframe::egui::{Pos2, Vec2};

pub const ROTATE_DEGREES_PER_PIXEL: f32 = 0.5;
pub const PAN_UNITS_PER_PIXEL: f32 = 0.01;
pub const ZOOM_UNITS_PER_NOTCH: f32 = 5.0;
pub const WHEEL_DELTA_PER_NOTCH: f32 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
}

/// Windowing-system independent input, queued by the UI and drained once per
/// frame by the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Drag {
        button: PointerButton,
        delta: Vec2,
        modifiers: Modifiers,
    },
    /// Raw wheel delta, 120 units per notch.
    Wheel { delta: f32 },
    DoubleClick { pos: Pos2 },
    RightClick { pos: Pos2 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    Rotate { pitch: f32, yaw: f32 },
    Pan { dx: f32, dy: f32 },
    Zoom(f32),
    ShowInfo(Pos2),
    ContextMenu(Pos2),
}

impl InputEvent {
    pub fn gesture(&self) -> Option<Gesture> {
        match *self {
            Self::Drag {
                button,
                delta,
                modifiers,
            } => match button {
                PointerButton::Primary if modifiers.shift => Some(pan_gesture(delta)),
                PointerButton::Primary => Some(Gesture::Rotate {
                    pitch: delta.y * ROTATE_DEGREES_PER_PIXEL,
                    yaw: delta.x * ROTATE_DEGREES_PER_PIXEL,
                }),
                PointerButton::Secondary => Some(pan_gesture(delta)),
                PointerButton::Middle => None,
            },
            Self::Wheel { delta } => {
                if delta.abs() <= f32::EPSILON {
                    None
                } else {
                    Some(Gesture::Zoom(
                        delta / WHEEL_DELTA_PER_NOTCH * ZOOM_UNITS_PER_NOTCH,
                    ))
                }
            }
            Self::DoubleClick { pos } => Some(Gesture::ShowInfo(pos)),
            Self::RightClick { pos } => Some(Gesture::ContextMenu(pos)),
        }
    }
}

fn pan_gesture(delta: Vec2) -> Gesture {
    // Screen y grows downward, world y upward.
    Gesture::Pan {
        dx: delta.x * PAN_UNITS_PER_PIXEL,
        dy: -delta.y * PAN_UNITS_PER_PIXEL,
    }
}

#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    fn drag(button: PointerButton, shift: bool, delta: Vec2) -> InputEvent {
        InputEvent::Drag {
            button,
            delta,
            modifiers: Modifiers { shift },
        }
    }

    #[test]
    fn left_drag_rotates_half_a_degree_per_pixel() {
        let gesture = drag(PointerButton::Primary, false, vec2(10.0, -4.0)).gesture();
        assert_eq!(gesture, Some(Gesture::Rotate { pitch: -2.0, yaw: 5.0 }));
    }

    #[test]
    fn right_and_shift_left_drag_pan_with_inverted_y() {
        let expected = Some(Gesture::Pan { dx: 1.0, dy: -0.5 });
        assert_eq!(drag(PointerButton::Secondary, false, vec2(100.0, 50.0)).gesture(), expected);
        assert_eq!(drag(PointerButton::Primary, true, vec2(100.0, 50.0)).gesture(), expected);
    }

    #[test]
    fn one_wheel_notch_zooms_five_units() {
        assert_eq!(InputEvent::Wheel { delta: 120.0 }.gesture(), Some(Gesture::Zoom(5.0)));
        assert_eq!(InputEvent::Wheel { delta: -240.0 }.gesture(), Some(Gesture::Zoom(-10.0)));
        assert_eq!(InputEvent::Wheel { delta: 0.0 }.gesture(), None);
    }

    #[test]
    fn clicks_map_to_picks() {
        let pos = pos2(12.0, 34.0);
        assert_eq!(InputEvent::DoubleClick { pos }.gesture(), Some(Gesture::ShowInfo(pos)));
        assert_eq!(InputEvent::RightClick { pos }.gesture(), Some(Gesture::ContextMenu(pos)));
    }

    #[test]
    fn queue_drains_in_arrival_order() {
        let mut queue = InputQueue::default();
        queue.push(InputEvent::Wheel { delta: 1.0 });
        queue.push(InputEvent::Wheel { delta: 2.0 });
        let drained = queue.drain().collect::<Vec<_>>();
        assert_eq!(
            drained,
            vec![InputEvent::Wheel { delta: 1.0 }, InputEvent::Wheel { delta: 2.0 }]
        );
        assert!(queue.is_empty());
    }
}
