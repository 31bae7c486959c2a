/// Geometry primitives for loaded models
use nalgebra::{Point3, Vector3};

use crate::bounds::BoundingBox;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Build a flat-shaded triangle, deriving the normal from the winding
    pub fn from_positions(p0: Point3<f32>, p1: Point3<f32>, p2: Point3<f32>) -> Self {
        let normal = face_normal(&p0, &p1, &p2);
        Self {
            vertices: [
                Vertex { position: p0, normal },
                Vertex { position: p1, normal },
                Vertex { position: p2, normal },
            ],
        }
    }

    /// Calculate the face normal from the triangle's vertices.
    ///
    /// Degenerate (zero-area) triangles yield a zero vector.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        face_normal(
            &self.vertices[0].position,
            &self.vertices[1].position,
            &self.vertices[2].position,
        )
    }
}

fn face_normal(p0: &Point3<f32>, p1: &Point3<f32>, p2: &Point3<f32>) -> Vector3<f32> {
    let cross = (p1 - p0).cross(&(p2 - p0));
    cross.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
}

/// A triangle soup, replaced wholesale on every load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.triangles.len() * 3
    }

    /// Iterate over every vertex position of every triangle
    pub fn positions(&self) -> impl Iterator<Item = &Point3<f32>> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| &v.position))
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions())
    }

    /// Move every vertex by `offset`
    pub fn translate(&mut self, offset: &Vector3<f32>) {
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position += *offset;
            }
        }
    }

    /// Translate the geometry so its bounding box is centered on the origin.
    ///
    /// Returns the offset that was applied.
    pub fn recenter(&mut self) -> Option<Vector3<f32>> {
        let offset = -self.bounding_box()?.center().coords;
        self.translate(&offset);
        Some(offset)
    }

    /// Create a simple cube mesh for testing
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let corner = |x: f32, y: f32, z: f32| Point3::new(x * half, y * half, z * half);
        let faces = [
            // Front, back, top, bottom, right, left
            [corner(-1., -1., 1.), corner(1., -1., 1.), corner(1., 1., 1.), corner(-1., 1., 1.)],
            [corner(1., -1., -1.), corner(-1., -1., -1.), corner(-1., 1., -1.), corner(1., 1., -1.)],
            [corner(-1., 1., 1.), corner(1., 1., 1.), corner(1., 1., -1.), corner(-1., 1., -1.)],
            [corner(-1., -1., -1.), corner(1., -1., -1.), corner(1., -1., 1.), corner(-1., -1., 1.)],
            [corner(1., -1., 1.), corner(1., -1., -1.), corner(1., 1., -1.), corner(1., 1., 1.)],
            [corner(-1., -1., -1.), corner(-1., -1., 1.), corner(-1., 1., 1.), corner(-1., 1., -1.)],
        ];

        let mut mesh = Self::with_capacity(12);
        for [a, b, c, d] in faces {
            mesh.add_triangle(Triangle::from_positions(a, b, c));
            mesh.add_triangle(Triangle::from_positions(a, c, d));
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_normals_point_outward() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangles.len(), 12);
        for triangle in &cube.triangles {
            let normal = triangle.calculate_normal();
            let centroid = triangle
                .vertices
                .iter()
                .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
                / 3.0;
            assert!(normal.dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn test_degenerate_triangle_normal_is_zero() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let triangle = Triangle::from_positions(p, p, p);
        assert_eq!(triangle.calculate_normal(), Vector3::zeros());
    }

    #[test]
    fn test_recenter_moves_bounds_to_origin() {
        let mut mesh = Mesh::cube(2.0);
        mesh.translate(&Vector3::new(10.0, -4.0, 3.0));

        let offset = mesh.recenter().unwrap();
        assert!((offset - Vector3::new(-10.0, 4.0, -3.0)).norm() < 1e-5);

        let bounds = mesh.bounding_box().unwrap();
        assert!(bounds.center().coords.norm() < 1e-5);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        let mut mesh = Mesh::new();
        assert!(mesh.bounding_box().is_none());
        assert!(mesh.recenter().is_none());
    }
}
