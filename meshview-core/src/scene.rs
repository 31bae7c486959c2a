/// The renderer seam: whatever draws the model implements [`Scene`]
use crate::bounds::BoundingBox;
use crate::error::{Result, ViewerError};
use crate::format::ModelFormat;
use crate::geometry::Mesh;
use crate::projection::Camera;

/// Handle to an object previously added to a [`Scene`]
pub type ObjectId = u64;

/// A parsed model, recentered so its bounding box sits on the origin
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub format: ModelFormat,
    pub mesh: Mesh,
    /// Bounds after recentering
    pub bounds: BoundingBox,
}

impl Model {
    /// Parse, validate and recenter a model
    pub fn from_bytes(name: &str, format: ModelFormat, data: &[u8]) -> Result<Self> {
        Self::from_mesh(name, format, format.parse(data)?)
    }

    pub fn from_mesh(name: &str, format: ModelFormat, mut mesh: Mesh) -> Result<Self> {
        if mesh.recenter().is_none() {
            return Err(ViewerError::InvalidGeometry(format!("{name} contains no triangles")));
        }
        let bounds = mesh
            .bounding_box()
            .filter(|b| !b.is_degenerate())
            .ok_or_else(|| {
                ViewerError::InvalidGeometry(format!("{name} has no extent on any axis"))
            })?;

        Ok(Self {
            name: name.to_string(),
            format,
            mesh,
            bounds,
        })
    }
}

/// Scene graph and renderer collaborator
pub trait Scene {
    /// Start drawing `model`, returning a handle for later removal
    fn add(&mut self, model: &Model) -> ObjectId;

    /// Stop drawing a previously added object
    fn remove(&mut self, id: ObjectId);

    /// Draw one frame from `camera`
    fn render(&mut self, camera: &Camera);
}
