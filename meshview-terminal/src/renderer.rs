/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshview_core::{config::rgb, Camera, Mesh, Model, ObjectId, Scene, Triangle, ViewerConfig};
use nalgebra::{Point2, Vector3};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Lambert lighting from the viewer configuration
#[derive(Debug, Clone, Copy)]
struct Lighting {
    ambient: f32,
    directional: f32,
    /// Unit vector pointing from the scene towards the light
    direction: Vector3<f32>,
    /// Material luminance, scales the final brightness
    albedo: f32,
}

impl Lighting {
    fn from_config(config: &ViewerConfig) -> Self {
        let [r, g, b] = rgb(config.material_color);
        Self {
            ambient: config.ambient_intensity,
            directional: config.directional_intensity,
            direction: Vector3::from(config.light_position)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3::z),
            albedo: 0.2126 * r + 0.7152 * g + 0.0722 * b,
        }
    }

    fn brightness(&self, normal: &Vector3<f32>) -> f32 {
        let diffuse = normal.dot(&self.direction).abs();
        ((self.ambient + self.directional * diffuse) * self.albedo / (self.ambient + self.directional).max(1.0))
            .clamp(0.0, 1.0)
    }
}

/// ASCII renderer that converts 3D meshes to terminal characters.
///
/// It plays the scene for the viewer: at most one model is drawn at a time.
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    lighting: Lighting,
    object: Option<(ObjectId, Mesh)>,
    next_id: ObjectId,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize, config: &ViewerConfig) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            lighting: Lighting::from_config(config),
            object: None,
            next_id: 0,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.char_buffer = vec![' '; width * height];
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    pub fn render_mesh(&mut self, mesh: &Mesh, camera: &Camera) {
        for triangle in &mesh.triangles {
            self.render_triangle(triangle, camera);
        }
    }

    fn render_triangle(&mut self, triangle: &Triangle, camera: &Camera) {
        // Project vertices to screen space
        let mut screen_coords = [(Point2::origin(), 0.0f32); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(&vertex.position, self.width as u32, self.height as u32) {
                Some(projected) => *slot = projected,
                None => return, // Triangle is clipped
            }
        }

        let brightness = self.lighting.brightness(&triangle.calculate_normal());

        // Map brightness to character, never blank for a visible face
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let char_index = char_index.clamp(1, LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];

        // Rasterize triangle using scanline algorithm
        self.rasterize_triangle(&screen_coords, character);
    }

    fn rasterize_triangle(&mut self, coords: &[(Point2<f32>, f32); 3], character: char) {
        let [(v0, d0), (v1, d1), (v2, d2)] = *coords;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Point2::new(x as f32 + 0.5, y as f32 + 0.5);

                // Barycentric coordinates
                if let Some((w0, w1, w2)) = barycentric(v0, v1, v2, p) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * d0 + w1 * d1 + w2 * d2;

                        let idx = y as usize * self.width + x as usize;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.char_buffer[idx] = character;
                        }
                    }
                }
            }
        }
    }

    /// Rasterized character at a cell, for inspection
    pub fn cell(&self, x: usize, y: usize) -> char {
        self.char_buffer[y * self.width + x]
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.cell(x, y);

                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl Scene for AsciiRenderer {
    fn add(&mut self, model: &Model) -> ObjectId {
        self.next_id += 1;
        self.object = Some((self.next_id, model.mesh.clone()));
        self.next_id
    }

    fn remove(&mut self, id: ObjectId) {
        if matches!(self.object, Some((current, _)) if current == id) {
            self.object = None;
        }
    }

    fn render(&mut self, camera: &Camera) {
        self.clear();
        if let Some((id, mesh)) = self.object.take() {
            self.render_mesh(&mesh, camera);
            self.object = Some((id, mesh));
        }
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: Point2<f32>,
    v1: Point2<f32>,
    v2: Point2<f32>,
    p: Point2<f32>,
) -> Option<(f32, f32, f32)> {
    let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.y - v2.y) * (p.x - v2.x) + (v2.x - v1.x) * (p.y - v2.y)) / denom;
    let w1 = ((v2.y - v0.y) * (p.x - v2.x) + (v0.x - v2.x) * (p.y - v2.y)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::{CameraPose, ModelFormat};
    use nalgebra::Point3;

    fn cube_model() -> Model {
        Model::from_mesh("cube", ModelFormat::Stl, Mesh::cube(2.0)).unwrap()
    }

    #[test]
    fn test_barycentric_of_vertex() {
        let (w0, w1, w2) = barycentric(
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 4.0),
            Point2::new(0.0, 0.0),
        )
        .unwrap();
        assert!((w0 - 1.0).abs() < 1e-6 && w1.abs() < 1e-6 && w2.abs() < 1e-6);
    }

    #[test]
    fn test_render_draws_added_model() {
        let mut renderer = AsciiRenderer::new(40, 20, &ViewerConfig::default());
        let mut camera = Camera::new(40, 40);
        camera.apply_pose(&CameraPose::new(Point3::new(0.0, 0.0, 6.0), Point3::origin()));

        let id = renderer.add(&cube_model());
        renderer.render(&camera);
        assert_ne!(renderer.cell(20, 10), ' ');

        renderer.remove(id);
        assert!(!renderer.has_object());
        renderer.render(&camera);
        assert_eq!(renderer.cell(20, 10), ' ');
    }

    #[test]
    fn test_removing_stale_id_keeps_model() {
        let mut renderer = AsciiRenderer::new(10, 10, &ViewerConfig::default());
        let first = renderer.add(&cube_model());
        let _second = renderer.add(&cube_model());
        renderer.remove(first);
        assert!(renderer.has_object());
    }

    #[test]
    fn test_draw_writes_every_cell() {
        let renderer = AsciiRenderer::new(4, 2, &ViewerConfig::default());
        let mut out = Vec::new();
        renderer.draw(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.matches(' ').count(), 8);
    }
}
