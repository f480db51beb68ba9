//! Euler-angle first-person camera.
//!
//! Only `position` is set directly; `front`, `right` and `up` are derived
//! from yaw, pitch and the world up vector and are recomputed on every
//! rotation.

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

const PITCH_LIMIT: f32 = 89.0;
const MIN_ZOOM: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    /// Degrees.
    yaw: f32,
    /// Degrees, within [-89, 89] after a clamped rotation.
    pitch: f32,
    /// Vertical field of view in degrees.
    zoom: f32,
    max_zoom: Option<f32>,
    pub movement_speed: f32,
    pub sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let defaults = CameraConfig::default();
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: world_up,
            right: Vec3::X,
            world_up,
            yaw,
            pitch,
            zoom: defaults.zoom,
            max_zoom: defaults.max_zoom,
            movement_speed: defaults.movement_speed,
            sensitivity: defaults.sensitivity,
        };
        camera.update_vectors();
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::new(
            Vec3::from_array(config.position),
            Vec3::from_array(config.world_up),
            config.yaw,
            config.pitch,
        );
        camera.zoom = config.zoom.max(MIN_ZOOM);
        camera.max_zoom = config.max_zoom;
        camera.movement_speed = config.movement_speed;
        camera.sensitivity = config.sensitivity;
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom_degrees(&self) -> f32 {
        self.zoom
    }

    /// Translate along the camera basis by `movement_speed * dt`.
    pub fn move_by(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.movement_speed * dt;
        let offset = match direction {
            CameraMovement::Forward => self.front,
            CameraMovement::Backward => -self.front,
            CameraMovement::Left => -self.right,
            CameraMovement::Right => self.right,
            CameraMovement::Up => self.up,
            CameraMovement::Down => -self.up,
        };
        self.position += offset * velocity;
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, clamp_pitch: bool) {
        self.yaw += dx * self.sensitivity;
        self.pitch += dy * self.sensitivity;
        if clamp_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    /// Narrow the field of view by `offset` degrees (negative widens).
    pub fn zoom(&mut self, offset: f32) {
        let mut zoom = self.zoom - offset;
        if let Some(max) = self.max_zoom {
            zoom = zoom.min(max);
        }
        self.zoom = zoom.max(MIN_ZOOM);
    }

    pub fn set_world_up(&mut self, world_up: Vec3) {
        self.world_up = world_up;
        self.update_vectors();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Right-handed perspective with a [0, 1] depth range.
    pub fn projection_matrix(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, near, far)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
