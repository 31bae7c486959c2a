/// Orbit controls: drag/scroll input mapped to camera motion around a target
use nalgebra::{Point3, Vector3};

use crate::fit::CameraPose;
use crate::projection::Camera;

/// Keeps the polar angle away from the poles where `look_at` degenerates
const POLAR_EPSILON: f32 = 1e-3;

/// Spherical coordinates of the camera around its target.
///
/// `azimuth` rotates around +Y starting at +Z, `polar` is measured from +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub azimuth: f32,
    pub polar: f32,
}

impl Spherical {
    pub fn from_offset(offset: &Vector3<f32>) -> Self {
        let radius = offset.norm();
        if radius <= f32::EPSILON {
            return Self {
                radius: 0.0,
                azimuth: 0.0,
                polar: std::f32::consts::FRAC_PI_2,
            };
        }
        Self {
            radius,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_polar = self.polar.sin();
        Vector3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        )
    }
}

/// Orbit controller with optional damping (inertia)
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical: Spherical,
    pending_azimuth: f32,
    pending_polar: f32,
    pending_scale: f32,
}

impl OrbitControls {
    /// Attach to a camera, orbiting around its current target
    pub fn new(camera: &Camera) -> Self {
        Self {
            target: camera.target,
            enable_damping: true,
            damping_factor: 0.05,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical: Spherical::from_offset(&(camera.position - camera.target)),
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_scale: 1.0,
        }
    }

    pub fn spherical(&self) -> Spherical {
        self.spherical
    }

    /// Snap to a new pose and drop any residual motion
    pub fn reset(&mut self, pose: &CameraPose) {
        self.target = pose.target;
        self.spherical = Spherical::from_offset(&(pose.position - pose.target));
        self.pending_azimuth = 0.0;
        self.pending_polar = 0.0;
        self.pending_scale = 1.0;
    }

    /// Queue a rotation, in radians
    pub fn rotate(&mut self, delta_azimuth: f32, delta_polar: f32) {
        self.pending_azimuth += delta_azimuth;
        self.pending_polar += delta_polar;
    }

    /// Queue a dolly; `scale < 1` moves towards the target
    pub fn zoom(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.pending_scale *= scale;
        }
    }

    /// True once all queued motion has been applied
    pub fn is_settled(&self) -> bool {
        self.pending_azimuth.abs() < 1e-6
            && self.pending_polar.abs() < 1e-6
            && (self.pending_scale - 1.0).abs() < 1e-6
    }

    /// Advance one frame and write the resulting pose into `camera`.
    ///
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let before = camera.pose();

        let step = if self.enable_damping {
            self.damping_factor.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.spherical.azimuth += self.pending_azimuth * step;
        self.spherical.polar = (self.spherical.polar + self.pending_polar * step)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
        self.spherical.radius = (self.spherical.radius * self.pending_scale)
            .clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.pending_azimuth *= 1.0 - step;
            self.pending_polar *= 1.0 - step;
        } else {
            self.pending_azimuth = 0.0;
            self.pending_polar = 0.0;
        }
        self.pending_scale = 1.0;

        camera.target = self.target;
        camera.position = self.target + self.spherical.to_offset();
        camera.pose() != before
    }
}
