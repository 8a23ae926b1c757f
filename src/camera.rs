use cgmath::{InnerSpace, Rotation3, SquareMatrix};

/// Movement requested for one frame. Axis values are in [-1, 1], mouse deltas in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    pub forward: f32,
    pub strafe: f32,
    pub vertical: f32,
    pub mouse_dx: f32,
    pub mouse_dy: f32,
}

const MAX_ELEVATION_DEG: f32 = 89.0;

pub trait Camera {
    fn get_view(&self) -> &cgmath::Matrix4<f32>;
    fn get_projection(&self) -> &cgmath::Matrix4<f32>;
    fn update_matrices(&mut self);

    fn get_position(&self) -> cgmath::Point3<f32>;
}

#[derive(Debug)]
pub struct PerspectiveCamera {
    pub name: String,

    pub view: cgmath::Matrix4<f32>,
    pub projection: cgmath::Matrix4<f32>,

    pub position: cgmath::Point3<f32>,
    pub orientation: cgmath::Vector3<f32>,
    pub up: cgmath::Vector3<f32>,

    pub fov: f32, // in deg
    pub aspect_ratio: f32,
    pub width: u32,
    pub height: u32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub speed: f32, // units per second
}

impl PerspectiveCamera {
    pub fn new(
        name: String,
        position: cgmath::Point3<f32>,
        fov: f32,
        width: u32,
        height: u32,
        near_plane: f32,
        far_plane: f32,
        speed: f32,
    ) -> Self {
        let mut camera = Self {
            name,

            view: cgmath::Matrix4::identity(),
            projection: cgmath::Matrix4::identity(),

            position,
            orientation: cgmath::vec3(0.0, 0.0, -1.0),
            up: cgmath::vec3(0.0, 1.0, 0.0),

            fov,
            aspect_ratio: 1.0,

            width: 1,
            height: 1,

            near_plane,
            far_plane,
            speed,
        };
        camera.resize(width, height);
        camera
    }

    /// Points the camera at `target` and refreshes its matrices.
    pub fn look_at(mut self, target: cgmath::Point3<f32>) -> Self {
        let direction = target - self.position;
        if direction.magnitude2() > f32::EPSILON {
            self.orientation = direction.normalize();
        }
        self.update_matrices();
        self
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.aspect_ratio = self.width as f32 / self.height as f32;
        self.update_matrices();
    }

    pub fn right(&self) -> cgmath::Vector3<f32> {
        self.orientation.cross(self.up).normalize()
    }

    /// Moves and turns the camera for `dt` seconds of `input`, then rebuilds the view.
    pub fn apply_input(&mut self, input: &CameraInput, dt: f32) {
        let step = self.speed * dt;

        self.position += self.orientation * (input.forward * step);
        self.position += self.right() * (input.strafe * step);
        self.position += self.up * (input.vertical * step);

        if input.mouse_dx != 0.0 || input.mouse_dy != 0.0 {
            let fov = self.fov.to_radians();
            let pitch = fov * (input.mouse_dy / self.height as f32);
            let yaw = fov * self.aspect_ratio * (input.mouse_dx / self.width as f32);

            // Elevation stays within MAX_ELEVATION so `right` never degenerates.
            let elevation = self.orientation.dot(self.up).clamp(-1.0, 1.0).asin();
            let max = MAX_ELEVATION_DEG.to_radians();
            let delta = (elevation - pitch).clamp(-max, max) - elevation;
            let pitch_quat = cgmath::Quaternion::from_axis_angle(self.right(), cgmath::Rad(delta));
            self.orientation = pitch_quat * self.orientation;

            let yaw_quat = cgmath::Quaternion::from_axis_angle(self.up, cgmath::Rad(-yaw));
            self.orientation = (yaw_quat * self.orientation).normalize();
        }

        self.update_matrices();
    }
}

impl Camera for PerspectiveCamera {
    fn get_view(&self) -> &cgmath::Matrix4<f32> {
        &self.view
    }

    fn get_projection(&self) -> &cgmath::Matrix4<f32> {
        &self.projection
    }

    fn update_matrices(&mut self) {
        self.view =
            cgmath::Matrix4::look_at_rh(self.position, self.position + self.orientation, self.up);
        self.projection = cgmath::perspective(
            cgmath::Deg(self.fov),
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        );
    }

    fn get_position(&self) -> cgmath::Point3<f32> {
        self.position
    }
}
