/// Model file formats and dispatch to the matching parser
use std::fmt;
use std::path::Path;

use crate::error::{Result, ViewerError};
use crate::geometry::Mesh;
use crate::{gltf, stl};

/// Mesh formats the viewer can open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Stl,
    Gltf,
    Glb,
}

impl ModelFormat {
    /// Classify a file name or URL by its extension (case-insensitive).
    ///
    /// Query strings and fragments are ignored so `model.glb?v=2` works.
    pub fn from_name(name: &str) -> Result<Self> {
        let path = name.split(['?', '#']).next().unwrap_or(name);
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ViewerError::UnsupportedFormat(format!("{name} has no extension")))?;

        match extension.to_ascii_lowercase().as_str() {
            "stl" => Ok(ModelFormat::Stl),
            "gltf" => Ok(ModelFormat::Gltf),
            "glb" => Ok(ModelFormat::Glb),
            other => Err(ViewerError::UnsupportedFormat(format!(
                "{name}: .{other} files are not supported (expected .stl, .gltf or .glb)"
            ))),
        }
    }

    /// Parse raw file bytes into a mesh
    pub fn parse(self, data: &[u8]) -> Result<Mesh> {
        match self {
            ModelFormat::Stl => stl::parse_stl(data),
            // Some exporters write binary containers with a .gltf name
            ModelFormat::Gltf if gltf::is_glb(data) => gltf::parse_glb(data),
            ModelFormat::Gltf => gltf::parse_gltf(data),
            ModelFormat::Glb => gltf::parse_glb(data),
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFormat::Stl => write!(f, "STL"),
            ModelFormat::Gltf => write!(f, "glTF"),
            ModelFormat::Glb => write!(f, "GLB"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(ModelFormat::from_name("models/reactor_vessel.stl").unwrap(), ModelFormat::Stl);
        assert_eq!(ModelFormat::from_name("Duck.GLTF").unwrap(), ModelFormat::Gltf);
        assert_eq!(ModelFormat::from_name("https://host/a.glb?raw=1").unwrap(), ModelFormat::Glb);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        for name in ["teapot.obj", "README", "archive.stl.zip"] {
            assert!(matches!(
                ModelFormat::from_name(name),
                Err(ViewerError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_parse_dispatches_to_stl() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());
        assert!(ModelFormat::Stl.parse(&data).unwrap().is_empty());
        assert!(matches!(ModelFormat::Glb.parse(&data), Err(ViewerError::InvalidGeometry(_))));
    }
}
