/// meshview core library - model loading, framing and camera logic
///
/// This library holds everything the viewer hosts share: STL and glTF
/// parsing, bounding boxes, fitting a model into the camera view, orbit
/// controls, and the controller that ties one displayed model to a scene.
/// Drawing and file picking are left to the hosts.

pub mod bounds;
pub mod config;
pub mod error;
pub mod fit;
pub mod format;
pub mod geometry;
pub mod gltf;
pub mod loader;
pub mod orbit;
pub mod projection;
pub mod scene;
pub mod stl;
pub mod viewer;

// Re-export commonly used types
pub use bounds::BoundingBox;
pub use config::{ModelEntry, ViewerConfig};
pub use error::{Result, ViewerError};
pub use fit::{CameraPose, ViewFitter};
pub use format::ModelFormat;
pub use geometry::{Mesh, Triangle, Vertex};
pub use loader::{FileLoader, LoadTicket, LoadTracker, MeshLoader, MeshSource};
pub use orbit::OrbitControls;
pub use projection::{Camera, ProjectionMode};
pub use scene::{Model, ObjectId, Scene};
pub use viewer::{LoadOutcome, StatusMessage, Viewer};
