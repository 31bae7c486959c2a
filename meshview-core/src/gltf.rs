/// glTF 2.0 reader for `.gltf` (JSON) and `.glb` (binary container) files
///
/// Only what the viewer needs is read: triangle positions from every mesh
/// reachable through the default scene, placed by their node transforms.
/// Normals are rebuilt per face. Buffers must be embedded (GLB `BIN` chunk
/// or base64 `data:` URIs) since the loader only ever hands over one file.
use std::collections::{HashMap, HashSet};

use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use nalgebra::{Matrix4, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use nom::{bytes::complete::tag, number::complete::le_u32, IResult};
use serde::Deserialize;

use crate::error::{Result, ViewerError};
use crate::geometry::{Mesh, Triangle};

const GLB_MAGIC: &[u8] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_U8: u32 = 5121;
const COMPONENT_U16: u32 = 5123;
const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;

const MODE_TRIANGLES: u32 = 4;
const MODE_TRIANGLE_STRIP: u32 = 5;
const MODE_TRIANGLE_FAN: u32 = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<SceneDef>,
    #[serde(default)]
    nodes: Vec<NodeDef>,
    #[serde(default)]
    meshes: Vec<MeshDef>,
    #[serde(default)]
    accessors: Vec<AccessorDef>,
    #[serde(default)]
    buffer_views: Vec<BufferViewDef>,
    #[serde(default)]
    buffers: Vec<BufferDef>,
}

#[derive(Debug, Deserialize)]
struct SceneDef {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct NodeDef {
    #[serde(default)]
    children: Vec<usize>,
    mesh: Option<usize>,
    matrix: Option<[f32; 16]>,
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
}

#[derive(Debug, Deserialize)]
struct MeshDef {
    #[serde(default)]
    primitives: Vec<PrimitiveDef>,
}

#[derive(Debug, Deserialize)]
struct PrimitiveDef {
    attributes: HashMap<String, usize>,
    indices: Option<usize>,
    #[serde(default = "default_mode")]
    mode: u32,
}

fn default_mode() -> u32 {
    MODE_TRIANGLES
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessorDef {
    buffer_view: Option<usize>,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferViewDef {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferDef {
    uri: Option<String>,
    byte_length: usize,
}

fn invalid(message: impl Into<String>) -> ViewerError {
    ViewerError::InvalidGeometry(message.into())
}

/// Parse a JSON `.gltf` document with embedded buffers
pub fn parse_gltf(data: &[u8]) -> Result<Mesh> {
    let document: Document =
        serde_json::from_slice(data).map_err(|e| invalid(format!("malformed glTF JSON: {e}")))?;
    build_mesh(&document, None)
}

/// Parse a binary `.glb` container
pub fn parse_glb(data: &[u8]) -> Result<Mesh> {
    let (json, bin) = split_glb(data)?;
    let document: Document =
        serde_json::from_slice(json).map_err(|e| invalid(format!("malformed GLB JSON chunk: {e}")))?;
    build_mesh(&document, bin)
}

/// True when `data` starts with the GLB magic
pub fn is_glb(data: &[u8]) -> bool {
    data.starts_with(GLB_MAGIC)
}

fn glb_header(input: &[u8]) -> IResult<&[u8], (u32, u32)> {
    let (input, _) = tag(GLB_MAGIC)(input)?;
    let (input, version) = le_u32(input)?;
    let (input, length) = le_u32(input)?;
    Ok((input, (version, length)))
}

fn glb_chunk(input: &[u8]) -> IResult<&[u8], (u32, &[u8])> {
    let (input, length) = le_u32(input)?;
    let (input, kind) = le_u32(input)?;
    let (input, payload) = nom::bytes::complete::take(length as usize)(input)?;
    Ok((input, (kind, payload)))
}

fn split_glb(data: &[u8]) -> Result<(&[u8], Option<&[u8]>)> {
    let (mut input, (version, length)) =
        glb_header(data).map_err(|_| invalid("not a GLB file: bad header"))?;
    if version != 2 {
        return Err(invalid(format!("unsupported GLB version {version}")));
    }
    if (length as usize) < data.len() {
        input = &input[..(length as usize).saturating_sub(12)];
    }

    let mut json = None;
    let mut bin = None;
    while !input.is_empty() {
        let (rest, (kind, payload)) =
            glb_chunk(input).map_err(|_| invalid("truncated GLB chunk"))?;
        match kind {
            CHUNK_JSON if json.is_none() => json = Some(payload),
            CHUNK_BIN if bin.is_none() => bin = Some(payload),
            _ => log::debug!("skipping GLB chunk 0x{kind:08x}"),
        }
        input = rest;
    }

    let json = json.ok_or_else(|| invalid("GLB has no JSON chunk"))?;
    Ok((json, bin))
}

fn resolve_buffers(document: &Document, glb_bin: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
    document
        .buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| {
            let bytes = match buffer.uri.as_deref() {
                None => glb_bin
                    .filter(|_| index == 0)
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| invalid(format!("buffer {index} has no data")))?,
                Some(uri) if uri.starts_with("data:") => {
                    let (_, encoded) = uri
                        .split_once(',')
                        .ok_or_else(|| invalid(format!("buffer {index} has a malformed data URI")))?;
                    BASE64_ENGINE
                        .decode(encoded)
                        .map_err(|e| invalid(format!("buffer {index} is not valid base64: {e}")))?
                }
                Some(uri) => {
                    return Err(ViewerError::LoadFailure(format!(
                        "external glTF buffer '{uri}' is not available"
                    )))
                }
            };
            if bytes.len() < buffer.byte_length {
                return Err(invalid(format!(
                    "buffer {index} holds {} bytes, expected {}",
                    bytes.len(),
                    buffer.byte_length
                )));
            }
            Ok(bytes)
        })
        .collect()
}

struct Reader<'a> {
    document: &'a Document,
    buffers: Vec<Vec<u8>>,
}

impl Reader<'_> {
    /// Raw bytes of each element of an accessor, honoring `byteStride`
    fn elements(&self, index: usize, element_size: usize) -> Result<Vec<&[u8]>> {
        let accessor = self
            .document
            .accessors
            .get(index)
            .ok_or_else(|| invalid(format!("missing accessor {index}")))?;
        let view_index = accessor
            .buffer_view
            .ok_or_else(|| invalid(format!("accessor {index} has no bufferView")))?;
        let view = self
            .document
            .buffer_views
            .get(view_index)
            .ok_or_else(|| invalid(format!("missing bufferView {view_index}")))?;
        let buffer = self
            .buffers
            .get(view.buffer)
            .ok_or_else(|| invalid(format!("missing buffer {}", view.buffer)))?;

        let view_bytes = view
            .byte_offset
            .checked_add(view.byte_length)
            .and_then(|view_end| buffer.get(view.byte_offset..view_end))
            .ok_or_else(|| invalid(format!("bufferView {view_index} exceeds its buffer")))?;
        let stride = view.byte_stride.unwrap_or(element_size).max(element_size);

        (0..accessor.count)
            .map(|i| {
                i.checked_mul(stride)
                    .and_then(|step| step.checked_add(accessor.byte_offset))
                    .and_then(|start| Some(start..start.checked_add(element_size)?))
                    .and_then(|range| view_bytes.get(range))
                    .ok_or_else(|| invalid(format!("accessor {index} exceeds bufferView {view_index}")))
            })
            .collect()
    }

    fn accessor(&self, index: usize) -> Result<&AccessorDef> {
        self.document
            .accessors
            .get(index)
            .ok_or_else(|| invalid(format!("missing accessor {index}")))
    }

    fn positions(&self, index: usize) -> Result<Vec<Point3<f32>>> {
        let accessor = self.accessor(index)?;
        if accessor.component_type != COMPONENT_F32 || accessor.kind != "VEC3" {
            return Err(invalid(format!(
                "POSITION accessor {index} must be float VEC3"
            )));
        }
        let read = |bytes: &[u8]| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(self
            .elements(index, 12)?
            .into_iter()
            .map(|e| Point3::new(read(&e[0..4]), read(&e[4..8]), read(&e[8..12])))
            .collect())
    }

    fn indices(&self, index: usize) -> Result<Vec<u32>> {
        let accessor = self.accessor(index)?;
        if accessor.kind != "SCALAR" {
            return Err(invalid(format!("index accessor {index} must be SCALAR")));
        }
        let indices: Vec<u32> = match accessor.component_type {
            COMPONENT_U8 => self.elements(index, 1)?.into_iter().map(|e| e[0] as u32).collect(),
            COMPONENT_U16 => self
                .elements(index, 2)?
                .into_iter()
                .map(|e| u16::from_le_bytes([e[0], e[1]]) as u32)
                .collect(),
            COMPONENT_U32 => self
                .elements(index, 4)?
                .into_iter()
                .map(|e| u32::from_le_bytes([e[0], e[1], e[2], e[3]]))
                .collect(),
            other => return Err(invalid(format!("unsupported index component type {other}"))),
        };
        Ok(indices)
    }
}

fn local_transform(node: &NodeDef) -> Matrix4<f32> {
    if let Some(m) = node.matrix {
        return Matrix4::from_column_slice(&m);
    }
    let translation = node.translation.map_or_else(Vector3::zeros, Vector3::from);
    let rotation = node
        .rotation
        .map_or_else(UnitQuaternion::identity, |[x, y, z, w]| {
            UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
        });
    let scale = node.scale.map_or_else(|| Vector3::new(1.0, 1.0, 1.0), Vector3::from);

    Translation3::from(translation).to_homogeneous()
        * rotation.to_homogeneous()
        * Matrix4::new_nonuniform_scaling(&scale)
}

/// Root nodes of the default scene, or every parentless node without one
fn root_nodes(document: &Document) -> Vec<usize> {
    let scene = document.scene.unwrap_or(0);
    if let Some(def) = document.scenes.get(scene) {
        return def.nodes.clone();
    }
    let children: HashSet<usize> = document
        .nodes
        .iter()
        .flat_map(|n| n.children.iter().copied())
        .collect();
    (0..document.nodes.len()).filter(|i| !children.contains(i)).collect()
}

fn build_mesh(document: &Document, glb_bin: Option<&[u8]>) -> Result<Mesh> {
    let reader = Reader {
        document,
        buffers: resolve_buffers(document, glb_bin)?,
    };
    let mut mesh = Mesh::new();

    if document.nodes.is_empty() {
        // Bare mesh libraries without a node graph
        for index in 0..document.meshes.len() {
            append_mesh(&reader, index, &Matrix4::identity(), &mut mesh)?;
        }
        return Ok(mesh);
    }

    let mut stack: Vec<(usize, Matrix4<f32>)> = root_nodes(document)
        .into_iter()
        .map(|n| (n, Matrix4::identity()))
        .collect();
    let mut visited = HashSet::new();
    while let Some((index, parent)) = stack.pop() {
        if !visited.insert(index) {
            return Err(invalid(format!("node {index} appears twice in the scene graph")));
        }
        let node = document
            .nodes
            .get(index)
            .ok_or_else(|| invalid(format!("missing node {index}")))?;
        let world = parent * local_transform(node);
        if let Some(mesh_index) = node.mesh {
            append_mesh(&reader, mesh_index, &world, &mut mesh)?;
        }
        stack.extend(node.children.iter().map(|&child| (child, world)));
    }

    Ok(mesh)
}

fn append_mesh(reader: &Reader, index: usize, world: &Matrix4<f32>, mesh: &mut Mesh) -> Result<()> {
    let def = reader
        .document
        .meshes
        .get(index)
        .ok_or_else(|| invalid(format!("missing mesh {index}")))?;
    // Mirroring transforms flip the winding
    let mirrored = world.fixed_view::<3, 3>(0, 0).determinant() < 0.0;

    for primitive in &def.primitives {
        let Some(&position_accessor) = primitive.attributes.get("POSITION") else {
            continue;
        };
        let positions: Vec<Point3<f32>> = reader
            .positions(position_accessor)?
            .iter()
            .map(|p| world.transform_point(p))
            .collect();
        let indices = match primitive.indices {
            Some(accessor) => reader.indices(accessor)?,
            None => (0..positions.len() as u32).collect(),
        };

        for [a, b, c] in triangle_indices(primitive.mode, &indices) {
            let corner = |i: u32| {
                positions
                    .get(i as usize)
                    .copied()
                    .ok_or_else(|| invalid(format!("index {i} out of range in mesh {index}")))
            };
            let (pa, pb, pc) = (corner(a)?, corner(b)?, corner(c)?);
            let triangle = if mirrored {
                Triangle::from_positions(pa, pc, pb)
            } else {
                Triangle::from_positions(pa, pb, pc)
            };
            mesh.add_triangle(triangle);
        }
    }
    Ok(())
}

fn triangle_indices(mode: u32, indices: &[u32]) -> Vec<[u32; 3]> {
    match mode {
        MODE_TRIANGLES => indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect(),
        MODE_TRIANGLE_STRIP => indices
            .windows(3)
            .enumerate()
            .map(|(i, t)| if i % 2 == 0 { [t[0], t[1], t[2]] } else { [t[1], t[0], t[2]] })
            .collect(),
        MODE_TRIANGLE_FAN => indices
            .get(1..)
            .unwrap_or_default()
            .windows(2)
            .map(|t| [indices[0], t[0], t[1]])
            .collect(),
        other => {
            log::debug!("skipping non-triangle glTF primitive (mode {other})");
            Vec::new()
        }
    }
}
