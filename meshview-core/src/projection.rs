/// Camera and projection utilities
use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::fit::CameraPose;

/// Near plane as a share of the target distance; a fitted box always stays
/// farther from the camera than this
const NEAR_PLANE_RATIO: f32 = 0.01;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::FRAC_PI_3, // 60 degrees
            aspect: aspect_ratio(width, height),
            near: 0.1,
            far: 2000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose::new(self.position, self.target)
    }

    /// Move the camera to `pose`, pulling in the near plane and stretching
    /// the far plane if the model would otherwise be cut off
    pub fn apply_pose(&mut self, pose: &CameraPose) {
        self.position = pose.position;
        self.target = pose.target;
        let distance = pose.distance();
        let near = distance * NEAR_PLANE_RATIO;
        if near > 0.0 && near < self.near {
            self.near = near;
        }
        let far = distance * 2.0;
        if far > self.far {
            self.far = far;
        }
    }

    /// Resize handler: keep the projection in step with the viewport
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Project a world-space point to normalized device coordinates.
    ///
    /// Returns `None` for points behind the near plane. The result is not
    /// clipped against the sides of the frustum.
    pub fn project_to_ndc(&self, point: &Point3<f32>) -> Option<Point3<f32>> {
        let eye = self.view_matrix().transform_point(point);
        // Right-handed view space looks down -Z
        if -eye.z < self.near {
            return None;
        }
        Some(self.projection_matrix().transform_point(&eye))
    }

    /// Project a 3D point to 2D screen space.
    ///
    /// Returns the pixel position and the view-space depth, or `None` when
    /// the point falls outside the frustum.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<(Point2<f32>, f32)> {
        let ndc = self.project_to_ndc(point)?;
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
            return None;
        }

        let depth = (self.position - point).norm();
        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;
        Some((Point2::new(screen_x, screen_y), depth))
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert!((camera.fov_degrees() - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_height_viewport_keeps_finite_aspect() {
        let mut camera = Camera::default();
        camera.set_viewport(640, 0);
        assert!(camera.aspect.is_finite());
        assert_eq!(camera.aspect, 640.0);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::new(800, 600);
        let (screen, depth) = camera.project_to_screen(&Point3::origin(), 800, 600).unwrap();
        assert!((screen.x - 400.0).abs() < 1e-3);
        assert!((screen.y - 300.0).abs() < 1e-3);
        assert!((depth - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_point_behind_camera_is_rejected() {
        let camera = Camera::default();
        assert!(camera.project_to_ndc(&Point3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_apply_pose_extends_far_plane() {
        let mut camera = Camera::default();
        let pose = CameraPose::new(Point3::new(0.0, 0.0, 5000.0), Point3::origin());
        camera.apply_pose(&pose);
        assert_eq!(camera.position, pose.position);
        assert!(camera.far >= 10_000.0);
        assert_eq!(camera.near, 0.1);
    }

    #[test]
    fn test_apply_pose_pulls_in_near_plane() {
        let mut camera = Camera::default();
        let pose = CameraPose::new(Point3::new(0.0, 0.0, 0.08), Point3::origin());
        camera.apply_pose(&pose);
        assert!(camera.near <= 0.0008 + 1e-7);
        assert!(camera.project_to_ndc(&Point3::new(0.0, 0.0, 0.03)).is_some());
    }

    #[test]
    fn test_orthographic_spans_target_distance() {
        let mut camera = Camera::new(800, 400);
        camera.mode = ProjectionMode::Orthographic;

        // Height equals the distance to the target, width follows the aspect
        let top = camera.project_to_ndc(&Point3::new(0.0, 2.5, 0.0)).unwrap();
        assert!((top.y - 1.0).abs() < 1e-5);
        let right = camera.project_to_ndc(&Point3::new(5.0, 0.0, 0.0)).unwrap();
        assert!((right.x - 1.0).abs() < 1e-5);

        // No perspective shrink with depth
        let near = camera.project_to_ndc(&Point3::new(0.0, 2.5, 3.0)).unwrap();
        assert!((near.y - top.y).abs() < 1e-5);
    }
}
