//! Orbit camera for the Z-up simulation viewer

use glam::{Mat4, Vec3};

/// Elevation limit, just short of straight up/down.
const MAX_ELEVATION: f32 = 1.5;
const MIN_DISTANCE: f32 = 0.05;
const MAX_DISTANCE: f32 = 500.0;

/// Orbit parameters remembered for [`ViewerCamera::reset`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct Home {
    target: Vec3,
    azimuth: f32,
    elevation: f32,
    distance: f32,
}

/// Perspective camera orbiting a look-at target, with +Z up.
#[derive(Debug, Clone)]
pub struct ViewerCamera {
    pub target: Vec3,
    /// Angle around +Z, measured from +X, in radians.
    pub azimuth: f32,
    /// Angle above the XY plane, in radians.
    pub elevation: f32,
    pub distance: f32,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    home: Home,
}

impl ViewerCamera {
    pub fn new(aspect_ratio: f32) -> Self {
        let home = Home {
            target: Vec3::ZERO,
            azimuth: 90.0f32.to_radians(),
            elevation: 0.35,
            distance: 3.0,
        };
        Self {
            target: home.target,
            azimuth: home.azimuth,
            elevation: home.elevation,
            distance: home.distance,
            fov: 45.0f32.to_radians(),
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
            home,
        }
    }

    /// Frame a bounding sphere and make that the reset view.
    pub fn fit(&mut self, center: Vec3, radius: f32) {
        let radius = radius.max(0.1);
        self.home = Home {
            target: center,
            azimuth: self.home.azimuth,
            elevation: self.home.elevation,
            distance: (radius / (self.fov * 0.5).sin()).clamp(MIN_DISTANCE, MAX_DISTANCE),
        };
        self.reset();
    }

    /// Return to the fitted (or initial) view.
    pub fn reset(&mut self) {
        self.target = self.home.target;
        self.azimuth = self.home.azimuth;
        self.elevation = self.home.elevation;
        self.distance = self.home.distance;
    }

    /// Camera position in world coordinates.
    pub fn eye(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        self.target + self.distance * Vec3::new(cos_el * cos_az, cos_el * sin_az, sin_el)
    }

    /// Orbit around the target.
    pub fn orbit(&mut self, delta_azimuth: f32, delta_elevation: f32) {
        self.azimuth = (self.azimuth + delta_azimuth).rem_euclid(std::f32::consts::TAU);
        self.elevation = (self.elevation + delta_elevation).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Move the target in the view plane; deltas are fractions of the view distance.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Z).normalize_or_zero();
        let up = right.cross(forward);
        self.target += (right * -dx + up * dy) * self.distance;
    }

    /// Zoom in for positive `delta`, out for negative.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * 0.9f32.powf(delta)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Z)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn update_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}

/// Camera uniform data for shaders
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &ViewerCamera) -> Self {
        let eye = camera.eye();
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            position: [eye.x, eye.y, eye.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_eye_sits_at_distance() {
        let mut camera = ViewerCamera::new(1.5);
        camera.orbit(0.7, 0.2);
        assert_relative_eq!((camera.eye() - camera.target).length(), camera.distance, epsilon = 1e-5);
    }

    #[test]
    fn test_elevation_is_clamped() {
        let mut camera = ViewerCamera::new(1.0);
        camera.orbit(0.0, 10.0);
        assert_eq!(camera.elevation, MAX_ELEVATION);
        camera.orbit(0.0, -20.0);
        assert_eq!(camera.elevation, -MAX_ELEVATION);
    }

    #[test]
    fn test_zoom_stays_positive() {
        let mut camera = ViewerCamera::new(1.0);
        for _ in 0..200 {
            camera.zoom(5.0);
        }
        assert_eq!(camera.distance, MIN_DISTANCE);
        camera.zoom(-1.0);
        assert!(camera.distance > MIN_DISTANCE);
    }

    #[test]
    fn test_pan_moves_target_sideways() {
        let mut camera = ViewerCamera::new(1.0);
        camera.elevation = 0.0;
        camera.azimuth = 0.0; // looking along -X
        camera.pan(0.1, 0.0);
        assert_relative_eq!(camera.target.x, 0.0, epsilon = 1e-6);
        assert!(camera.target.y.abs() > 0.0);
        assert_relative_eq!(camera.target.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fit_then_reset() {
        let mut camera = ViewerCamera::new(1.0);
        camera.fit(Vec3::new(1.0, 2.0, 0.5), 1.0);
        let fitted = (camera.target, camera.distance);
        assert_eq!(fitted.0, Vec3::new(1.0, 2.0, 0.5));

        camera.orbit(1.0, 0.5);
        camera.pan(0.3, 0.3);
        camera.zoom(3.0);
        camera.reset();
        assert_eq!((camera.target, camera.distance), fitted);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = ViewerCamera::new(16.0 / 9.0);
        let clip = camera.view_projection() * camera.target.extend(1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }
}
