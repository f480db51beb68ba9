//! Press-and-hold camera controls.
//!
//! Hosts report button presses and releases; every tick the visualizer
//! applies each held control to the camera once.

use std::collections::BTreeSet;

use crate::camera::{Camera, CameraMovement};
use crate::config::ControlConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Control {
    Forward,
    Backward,
    Left,
    Right,
    TurnLeft,
    TurnRight,
    ZoomIn,
    ZoomOut,
}

impl Control {
    pub const ALL: [Control; 8] = [
        Control::Forward,
        Control::Backward,
        Control::Left,
        Control::Right,
        Control::TurnLeft,
        Control::TurnRight,
        Control::ZoomIn,
        Control::ZoomOut,
    ];

    /// Apply one tick's worth of this control.
    pub fn apply(self, camera: &mut Camera, steps: &ControlConfig) {
        match self {
            Control::Forward => camera.move_by(CameraMovement::Forward, steps.move_step),
            Control::Backward => camera.move_by(CameraMovement::Backward, steps.move_step),
            Control::Left => camera.move_by(CameraMovement::Left, steps.move_step),
            Control::Right => camera.move_by(CameraMovement::Right, steps.move_step),
            Control::TurnLeft => camera.rotate(-steps.rotate_step, 0.0, true),
            Control::TurnRight => camera.rotate(steps.rotate_step, 0.0, true),
            Control::ZoomIn => camera.zoom(steps.zoom_step),
            Control::ZoomOut => camera.zoom(-steps.zoom_step),
        }
    }
}

/// The set of controls currently held down.
#[derive(Debug, Clone, Default)]
pub struct ControlPad {
    pressed: BTreeSet<Control>,
}

impl ControlPad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, control: Control) {
        self.pressed.insert(control);
    }

    pub fn release(&mut self, control: Control) {
        self.pressed.remove(&control);
    }

    pub fn release_all(&mut self) {
        self.pressed.clear();
    }

    pub fn is_pressed(&self, control: Control) -> bool {
        self.pressed.contains(&control)
    }

    pub fn is_idle(&self) -> bool {
        self.pressed.is_empty()
    }

    /// Apply every held control once. Returns false when nothing is held.
    pub fn apply(&self, camera: &mut Camera, steps: &ControlConfig) -> bool {
        if self.pressed.is_empty() {
            return false;
        }
        camera.movement_speed = steps.movement_speed;
        for control in &self.pressed {
            control.apply(camera, steps);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_idle_pad_leaves_camera_alone() {
        let pad = ControlPad::new();
        let mut camera = Camera::default();
        assert!(!pad.apply(&mut camera, &ControlConfig::default()));
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 100.0));
    }

    #[test]
    fn test_held_forward_moves_each_tick() {
        let mut pad = ControlPad::new();
        pad.press(Control::Forward);
        let mut camera = Camera::default();
        let steps = ControlConfig::default();
        for _ in 0..3 {
            pad.apply(&mut camera, &steps);
        }
        // 50 units/s * 0.1 s per tick, three ticks along -Z.
        assert!((camera.position() - Vec3::new(0.0, 0.0, 85.0)).length() < 1e-3);

        pad.release(Control::Forward);
        assert!(pad.is_idle());
    }

    #[test]
    fn test_turn_and_zoom() {
        let mut pad = ControlPad::new();
        pad.press(Control::TurnRight);
        pad.press(Control::ZoomIn);
        let mut camera = Camera::default();
        pad.apply(&mut camera, &ControlConfig::default());
        assert!((camera.yaw() - (-90.0 + 0.05)).abs() < 1e-4);
        assert!((camera.zoom_degrees() - 44.5).abs() < 1e-6);

        pad.release_all();
        pad.press(Control::ZoomOut);
        pad.press(Control::TurnLeft);
        pad.apply(&mut camera, &ControlConfig::default());
        assert!((camera.yaw() + 90.0).abs() < 1e-4);
        assert!((camera.zoom_degrees() - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_opposing_controls_cancel() {
        let mut pad = ControlPad::new();
        pad.press(Control::Left);
        pad.press(Control::Right);
        let mut camera = Camera::default();
        pad.apply(&mut camera, &ControlConfig::default());
        assert!((camera.position() - Vec3::new(0.0, 0.0, 100.0)).length() < 1e-4);
        assert!(pad.is_pressed(Control::Left));
        assert_eq!(Control::ALL.len(), 8);
    }
}
