use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat4, Vec3, Vec4};

/// Camera for 3D rendering
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, target: Vec3, aspect: f32) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            aspect,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix (camera → clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get the combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio (e.g., on window resize)
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Project a world point into a viewport of `size` pixels.
    ///
    /// Returns pixel coordinates (origin top-left) and NDC depth, or `None`
    /// when the point is behind the camera.
    pub fn project(&self, world: Vec3, size: (f32, f32)) -> Option<(f32, f32, f32)> {
        let clip = self.view_projection_matrix() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x * 0.5 + 0.5) * size.0;
        let y = (1.0 - (ndc.y * 0.5 + 0.5)) * size.1;
        Some((x, y, ndc.z))
    }

    /// World-space length covered by one pixel at `distance` from the camera.
    pub fn pixel_world_size(&self, distance: f32, viewport_height: f32) -> f32 {
        2.0 * distance * (self.fov_y * 0.5).tan() / viewport_height.max(1.0)
    }
}

/// Orbit controller in spherical coordinates around `target`.
///
/// Input only accumulates deltas; [`OrbitControls::update`] applies them
/// (with damping) and must be called once per frame for as long as the
/// controller lives.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub radius: f32,
    /// Rotation about +Y, 0 looks down -Z from +Z.
    pub azimuth: f32,
    /// Angle from +Y, π/2 is the horizon.
    pub polar: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,

    delta_azimuth: f32,
    delta_polar: f32,
    zoom_scale: f32,
    pan_offset: Vec3,
}

impl OrbitControls {
    const EPS: f32 = 1e-6;

    /// Unrestricted controller initialised from the camera's current pose.
    pub fn new(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.length().max(Self::EPS);
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
        let azimuth = offset.x.atan2(offset.z);

        Self {
            target: camera.target,
            radius,
            azimuth,
            polar,
            min_polar: 0.0,
            max_polar: PI,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            enable_damping: false,
            damping_factor: 0.05,
            enable_zoom: true,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            delta_azimuth: 0.0,
            delta_polar: 0.0,
            zoom_scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    /// Turntable controller: horizontal orbit only, damped, no zoom, no pan.
    pub fn horizontal(camera: &Camera) -> Self {
        let mut controls = Self::new(camera);
        controls.min_polar = FRAC_PI_2;
        controls.max_polar = FRAC_PI_2;
        controls.polar = FRAC_PI_2;
        controls.enable_damping = true;
        controls.damping_factor = 0.08;
        controls.enable_zoom = false;
        controls.enable_pan = false;
        controls
    }

    /// Pointer drag in pixels over a viewport `viewport_height` pixels tall.
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let h = viewport_height.max(1.0);
        self.rotate_left(TAU * dx / h * self.rotate_speed);
        self.rotate_up(TAU * dy / h * self.rotate_speed);
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_azimuth -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_polar -= angle;
    }

    /// Scroll wheel input; positive zooms in. Ignored while zoom is disabled.
    pub fn scroll(&mut self, delta: f32) {
        if !self.enable_zoom || delta == 0.0 {
            return;
        }
        let step = 0.95_f32.powf(self.zoom_speed * delta.abs());
        if delta > 0.0 {
            self.zoom_scale *= step;
        } else {
            self.zoom_scale /= step;
        }
    }

    /// Screen-space pan in world units. Ignored while pan is disabled.
    pub fn pan(&mut self, right: f32, up: f32, camera: &Camera) {
        if !self.enable_pan {
            return;
        }
        let forward = (camera.target - camera.position).normalize_or_zero();
        let right_axis = forward.cross(camera.up).normalize_or_zero();
        let up_axis = right_axis.cross(forward);
        self.pan_offset += right_axis * right + up_axis * up;
    }

    /// Elevation of the camera above the target plane, in radians.
    pub fn elevation(&self) -> f32 {
        FRAC_PI_2 - self.polar
    }

    /// Apply pending input to the spherical state and write the camera pose.
    ///
    /// Returns true while the camera is still moving, so the caller knows to
    /// keep requesting frames.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let (d_az, d_polar) = if self.enable_damping {
            (
                self.delta_azimuth * self.damping_factor,
                self.delta_polar * self.damping_factor,
            )
        } else {
            (self.delta_azimuth, self.delta_polar)
        };

        self.azimuth += d_az;
        self.polar = (self.polar + d_polar)
            .clamp(self.min_polar, self.max_polar)
            .clamp(Self::EPS, PI - Self::EPS);
        self.radius = (self.radius * self.zoom_scale).clamp(self.min_distance.max(Self::EPS), self.max_distance);
        self.target += self.pan_offset;

        let moved = d_az.abs() > Self::EPS
            || d_polar.abs() > Self::EPS
            || (self.zoom_scale - 1.0).abs() > Self::EPS
            || self.pan_offset.length_squared() > Self::EPS;

        if self.enable_damping {
            self.delta_azimuth *= 1.0 - self.damping_factor;
            self.delta_polar *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.delta_azimuth = 0.0;
            self.delta_polar = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.zoom_scale = 1.0;

        let sin_polar = self.polar.sin();
        let offset = Vec3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        );
        camera.target = self.target;
        camera.position = self.target + offset;

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 2.8), Vec3::ZERO, 1.0)
    }

    fn settle(controls: &mut OrbitControls, camera: &mut Camera) {
        for _ in 0..400 {
            controls.update(camera);
        }
    }

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 16.0 / 9.0);

        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert_eq!(camera.aspect, 16.0 / 9.0);
    }

    #[test]
    fn test_view_matrix() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);

        let view = camera.view_matrix();
        // View matrix should translate camera to origin
        assert!(view.w_axis.z < 0.0);
    }

    #[test]
    fn test_project_center_and_behind() {
        let camera = front_camera();

        let (x, y, _) = camera.project(Vec3::ZERO, (800.0, 600.0)).unwrap();
        assert!((x - 400.0).abs() < 0.01);
        assert!((y - 300.0).abs() < 0.01);

        assert!(camera.project(Vec3::new(0.0, 0.0, 10.0), (800.0, 600.0)).is_none());
    }

    #[test]
    fn test_project_up_is_screen_up() {
        let camera = front_camera();
        let (_, y, _) = camera.project(Vec3::new(0.0, 0.2, 0.0), (800.0, 600.0)).unwrap();
        assert!(y < 300.0);
    }

    #[test]
    fn test_controls_from_front_camera() {
        let controls = OrbitControls::horizontal(&front_camera());

        assert!((controls.radius - 2.8).abs() < 1e-5);
        assert!(controls.azimuth.abs() < 1e-5);
        assert_eq!(controls.polar, FRAC_PI_2);
        assert_eq!(controls.damping_factor, 0.08);
        assert!(!controls.enable_zoom);
        assert!(!controls.enable_pan);
    }

    #[test]
    fn test_horizontal_drag_changes_azimuth() {
        let mut camera = front_camera();
        let mut controls = OrbitControls::horizontal(&camera);

        controls.drag(100.0, 0.0, 600.0);
        settle(&mut controls, &mut camera);

        assert!(controls.azimuth.abs() > 0.5);
        assert!(camera.position.x.abs() > 0.1);
        assert!((camera.position.length() - 2.8).abs() < 1e-4);
    }

    #[test]
    fn test_vertical_drag_keeps_elevation() {
        let mut camera = front_camera();
        let mut controls = OrbitControls::horizontal(&camera);

        controls.drag(0.0, 250.0, 600.0);
        settle(&mut controls, &mut camera);

        assert_eq!(controls.polar, FRAC_PI_2);
        assert!(controls.elevation().abs() < 1e-6);
        assert!(camera.position.y.abs() < 1e-5);
    }

    #[test]
    fn test_scroll_and_pan_disabled() {
        let mut camera = front_camera();
        let mut controls = OrbitControls::horizontal(&camera);

        controls.scroll(5.0);
        controls.pan(1.0, 1.0, &camera.clone());
        settle(&mut controls, &mut camera);

        assert!((controls.radius - 2.8).abs() < 1e-5);
        assert_eq!(controls.target, Vec3::ZERO);
    }

    #[test]
    fn test_damping_applies_fraction_per_frame() {
        let mut camera = front_camera();
        let mut controls = OrbitControls::horizontal(&camera);

        controls.rotate_left(-1.0);
        assert!(controls.update(&mut camera));
        assert!((controls.azimuth - 0.08).abs() < 1e-6);

        controls.update(&mut camera);
        assert!((controls.azimuth - (0.08 + 0.92 * 0.08)).abs() < 1e-6);
    }

    #[test]
    fn test_damping_settles() {
        let mut camera = front_camera();
        let mut controls = OrbitControls::horizontal(&camera);

        controls.drag(30.0, 0.0, 600.0);
        settle(&mut controls, &mut camera);

        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn test_unrestricted_zoom() {
        let mut camera = front_camera();
        let mut controls = OrbitControls::new(&camera);

        controls.scroll(1.0);
        controls.update(&mut camera);

        assert!(controls.radius < 2.8);
    }
}
