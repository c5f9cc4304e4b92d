//! Fly camera component.
//!
//! Yaw and pitch are in degrees. A yaw of -90 looks down -Z, which is the
//! conventional forward axis for glTF content.

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Vector3, perspective};

/// cgmath produces OpenGL clip space (z in [-1, 1]); wgpu wants z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);
const PITCH_LIMIT: f32 = 89.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sensitivity: f32,
    pub active: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 3.0),
            yaw: -90.0,
            pitch: 0.0,
            fov_y: 45.0,
            near: 0.1,
            far: 100.0,
            speed: 2.5,
            sensitivity: 0.05,
            active: true,
        }
    }
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, yaw: f32, pitch: f32) -> Self {
        Self {
            position: position.into(),
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            ..Default::default()
        }
    }

    pub fn front(&self) -> Vector3<f32> {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.front().cross(WORLD_UP).normalize()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.right().cross(self.front()).normalize()
    }

    /// Applies a mouse delta. Pitch is clamped so the view never flips.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Moves along the camera axes; `forward` and `strafe` are in [-1, 1].
    pub fn translate(&mut self, forward: f32, strafe: f32, dt: f32) {
        let step = self.speed * dt;
        self.position += self.front() * forward * step + self.right() * strafe * step;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.front(), WORLD_UP)
    }

    /// Projection for a viewport of `width` x `height` pixels.
    pub fn projection_matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        OPENGL_TO_WGPU_MATRIX * perspective(Deg(self.fov_y), aspect, self.near, self.far)
    }
}
