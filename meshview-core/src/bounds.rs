/// Axis-aligned bounding boxes
use nalgebra::{Point3, Vector3};

/// Smallest axis-aligned box containing a set of points.
///
/// `min <= max` holds componentwise for every box built through
/// [`BoundingBox::new`] or [`BoundingBox::from_points`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Build a box from two opposite corners in any order
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Bounds of all points, `None` when the iterator is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        points.into_iter().fold(None, |acc, p| match acc {
            Some(bounds) => Some(bounds.expanded_to(p)),
            None => Some(Self { min: *p, max: *p }),
        })
    }

    fn expanded_to(self, point: &Point3<f32>) -> Self {
        Self {
            min: self.min.inf(point),
            max: self.max.sup(point),
        }
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Diagonal vector from `min` to `max`
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max()
    }

    /// Radius of the sphere around `center()` touching every corner
    pub fn bounding_radius(&self) -> f32 {
        self.size().norm() * 0.5
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|c| c.is_finite())
    }

    /// True when no axis has positive extent (a single point) or a
    /// coordinate is NaN/infinite
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.max_dimension() <= 0.0
    }
}
