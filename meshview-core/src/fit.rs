/// Framing a bounding box in a perspective camera
use nalgebra::{Point3, Vector3};

use crate::bounds::BoundingBox;
use crate::error::{Result, ViewerError};
use crate::projection::Camera;

/// Camera position plus the point it looks at and orbits around
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl CameraPose {
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        Self { position, target }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Unit vector from the target towards the camera
    pub fn view_direction(&self) -> Option<Vector3<f32>> {
        (self.position - self.target).try_normalize(f32::EPSILON)
    }
}

/// Computes camera poses that keep a whole bounding box in view.
///
/// The fitter is pure: it never touches a live camera. It only remembers the
/// direction the camera should sit in relative to the box center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFitter {
    direction: Vector3<f32>,
}

impl ViewFitter {
    /// Isometric placement, equal offsets on all three axes
    pub fn isometric() -> Self {
        Self {
            direction: Vector3::new(1.0, 1.0, 1.0).normalize(),
        }
    }

    /// Fit along an arbitrary direction; zero vectors fall back to isometric
    pub fn with_direction(direction: Vector3<f32>) -> Self {
        match direction.try_normalize(f32::EPSILON) {
            Some(direction) if direction.iter().all(|c| c.is_finite()) => Self { direction },
            _ => Self::isometric(),
        }
    }

    /// Keep the camera's current viewing direction, as "center view" does
    pub fn from_camera(camera: &Camera) -> Self {
        Self::with_direction(camera.position - camera.target)
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Compute a pose that frames `bounds`.
    ///
    /// `fov_degrees` is the vertical field of view, `aspect` is width over
    /// height, and `margin` scales the tightest distance (1.0 = tight).
    pub fn fit(
        &self,
        bounds: &BoundingBox,
        fov_degrees: f32,
        aspect: f32,
        margin: f32,
    ) -> Result<CameraPose> {
        let distance = fit_distance(bounds, fov_degrees, aspect, margin)?;
        let target = bounds.center();
        Ok(CameraPose {
            position: target + self.direction * distance,
            target,
        })
    }
}

impl Default for ViewFitter {
    fn default() -> Self {
        Self::isometric()
    }
}

/// Distance from the box center at which the box fills the frustum
pub fn fit_distance(bounds: &BoundingBox, fov_degrees: f32, aspect: f32, margin: f32) -> Result<f32> {
    validate_parameters(fov_degrees, aspect, margin)?;
    if bounds.is_degenerate() {
        return Err(ViewerError::InvalidGeometry(format!(
            "bounding box has no extent: min {:?}, max {:?}",
            bounds.min, bounds.max
        )));
    }

    let half_vertical = fov_degrees.to_radians() * 0.5;
    let half_horizontal = (aspect * half_vertical.tan()).atan();
    let max_dimension = bounds.max_dimension();

    let height_limited = max_dimension / half_vertical.tan();
    let width_limited = max_dimension / half_horizontal.tan();
    // Corners stick out past the face extents at wide angles
    let sphere_limited = bounds.bounding_radius() / half_vertical.min(half_horizontal).sin();

    let distance = height_limited.max(width_limited).max(sphere_limited) * margin;
    if !distance.is_finite() {
        return Err(ViewerError::InvalidGeometry(format!(
            "camera distance overflowed for max dimension {max_dimension}"
        )));
    }
    Ok(distance)
}

fn validate_parameters(fov_degrees: f32, aspect: f32, margin: f32) -> Result<()> {
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(ViewerError::InvalidParameter(format!(
            "field of view must be within (0, 180) degrees, got {fov_degrees}"
        )));
    }
    if !(aspect > 0.0 && aspect.is_finite()) {
        return Err(ViewerError::InvalidParameter(format!(
            "aspect ratio must be positive, got {aspect}"
        )));
    }
    if !(margin >= 1.0 && margin.is_finite()) {
        return Err(ViewerError::InvalidParameter(format!(
            "margin factor must be at least 1.0, got {margin}"
        )));
    }
    Ok(())
}
