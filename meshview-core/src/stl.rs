/// STL file parser for binary and ASCII formats
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::opt,
    multi::many0,
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{Result, ViewerError};
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh> {
    if data.len() < HEADER_LEN + 4 {
        return Err(ViewerError::InvalidGeometry(
            "file too small to be a valid STL".to_string(),
        ));
    }

    let body = &data[HEADER_LEN..];
    let (mut input, triangle_count) = le_u32::<_, nom::error::Error<&[u8]>>(body)
        .map_err(|e| ViewerError::InvalidGeometry(format!("bad STL header: {e:?}")))?;
    let triangle_count = triangle_count as usize;

    let available = input.len() / FACET_LEN;
    if triangle_count > available {
        return Err(ViewerError::InvalidGeometry(format!(
            "STL declares {triangle_count} triangles but only {available} are present"
        )));
    }

    let mut mesh = Mesh::with_capacity(triangle_count);
    for _ in 0..triangle_count {
        let (rest, triangle) = binary_facet(input)
            .map_err(|e| ViewerError::InvalidGeometry(format!("bad STL facet: {e:?}")))?;
        mesh.add_triangle(triangle);
        input = rest;
    }

    Ok(mesh)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, normal) = le_vector3(input)?;
    let (input, a) = le_vector3(input)?;
    let (input, b) = le_vector3(input)?;
    let (input, c) = le_vector3(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;

    Ok((input, facet(normal, [a, b, c])))
}

fn le_vector3(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

/// Build a triangle, recomputing the normal when the file stores none
fn facet(normal: (f32, f32, f32), corners: [(f32, f32, f32); 3]) -> Triangle {
    let [a, b, c] = corners.map(|(x, y, z)| Point3::new(x, y, z));
    let normal = Vector3::new(normal.0, normal.1, normal.2);
    if normal.norm_squared() <= f32::EPSILON || !normal.iter().all(|n| n.is_finite()) {
        return Triangle::from_positions(a, b, c);
    }
    let vertex = |position| Vertex { position, normal };
    Triangle::new(vertex(a), vertex(b), vertex(c))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(ViewerError::InvalidGeometry(format!(
            "failed to parse ASCII STL: {e:?}"
        ))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = opt(not_line_ending)(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, facet(normal, [v1, v2, v3])))
}

fn parse_vertex(input: &str) -> IResult<&str, (f32, f32, f32)> {
    preceded(preceded(multispace0, tag("vertex")), parse_vector3)(input)
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh> {
    // Binary exporters are free to start their header with "solid" too
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if data[start..].starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            match parse_ascii_stl(text) {
                Ok(mesh) => return Ok(mesh),
                Err(e) => log::debug!("ASCII STL parse failed, retrying as binary: {e}"),
            }
        }
    }

    parse_binary_stl(data)
}
