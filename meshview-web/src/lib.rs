/// meshview web bindings
///
/// Exposes the viewer controller to JavaScript. The page owns fetching and
/// drawing: it asks for a load generation, fetches the bytes however it
/// likes, hands them back with the same generation, and uploads the flat
/// `positions`/`normals` arrays to its renderer whenever `scene_revision`
/// changes. Only the most recently requested load is ever shown.

use std::collections::HashMap;

use log::{Level, LevelFilter, Log, Metadata, Record};
use meshview_core::{
    Camera, LoadOutcome, LoadTicket, Model, ObjectId, Scene, Viewer, ViewerConfig, ViewerError,
};
use wasm_bindgen::prelude::*;

/// Scene that keeps the displayed model as flat vertex arrays for upload
#[derive(Debug, Default)]
pub struct WebScene {
    positions: Vec<f32>,
    normals: Vec<f32>,
    object: Option<ObjectId>,
    next_id: ObjectId,
    revision: u32,
}

impl WebScene {
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    /// Bumped whenever the vertex arrays change
    pub fn revision(&self) -> u32 {
        self.revision
    }
}

impl Scene for WebScene {
    fn add(&mut self, model: &Model) -> ObjectId {
        let count = model.mesh.vertex_count() * 3;
        self.positions = Vec::with_capacity(count);
        self.normals = Vec::with_capacity(count);
        for triangle in &model.mesh.triangles {
            for vertex in &triangle.vertices {
                self.positions.extend_from_slice(&[vertex.position.x, vertex.position.y, vertex.position.z]);
                self.normals.extend_from_slice(&[vertex.normal.x, vertex.normal.y, vertex.normal.z]);
            }
        }

        self.next_id += 1;
        self.object = Some(self.next_id);
        self.revision += 1;
        self.next_id
    }

    fn remove(&mut self, id: ObjectId) {
        if self.object == Some(id) {
            self.object = None;
            self.positions.clear();
            self.normals.clear();
            self.revision += 1;
        }
    }

    // Drawing happens on the JavaScript side
    fn render(&mut self, _camera: &Camera) {}
}

fn to_js_error(error: ViewerError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen]
pub struct WebViewer {
    viewer: Viewer<WebScene>,
    pending: HashMap<u32, LoadTicket>,
    status_element: Option<String>,
}

#[wasm_bindgen]
impl WebViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(status_element_id: Option<String>, config_json: Option<String>) -> Result<WebViewer, JsValue> {
        let config = match config_json {
            Some(text) => ViewerConfig::from_json(&text).map_err(to_js_error)?,
            None => ViewerConfig::default(),
        };
        let viewer = Viewer::new(config, WebScene::default(), 800, 600).map_err(to_js_error)?;

        let web_viewer = WebViewer {
            viewer,
            pending: HashMap::new(),
            status_element: status_element_id,
        };
        web_viewer.mirror_status();
        Ok(web_viewer)
    }

    /// Start a load; pass the returned generation back with the bytes
    pub fn begin_load(&mut self, name: &str) -> Result<u32, JsValue> {
        let started = self.viewer.begin_load(name);
        self.mirror_status();
        let ticket = started.map_err(to_js_error)?;

        let generation = ticket.generation as u32;
        // Anything older can only ever come back stale
        self.pending.clear();
        self.pending.insert(generation, ticket);
        Ok(generation)
    }

    /// Hand over fetched bytes. Returns whether the model is now displayed.
    pub fn complete_load(&mut self, generation: u32, bytes: &[u8]) -> bool {
        self.finish(generation, Ok(bytes.to_vec()))
    }

    /// Report a failed fetch
    pub fn fail_load(&mut self, generation: u32, message: &str) {
        self.finish(generation, Err(ViewerError::LoadFailure(message.to_string())));
    }

    fn finish(&mut self, generation: u32, fetched: meshview_core::Result<Vec<u8>>) -> bool {
        let Some(ticket) = self.pending.remove(&generation) else {
            log::debug!("Ignoring completion for generation {generation}");
            return false;
        };
        let outcome = self.viewer.finish_load(ticket, fetched);
        self.mirror_status();
        outcome == LoadOutcome::Applied
    }

    pub fn center_view(&mut self) -> Result<(), JsValue> {
        self.viewer.center_view().map(|_| ()).map_err(to_js_error)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewer.resize(width, height);
    }

    pub fn orbit(&mut self, delta_azimuth: f32, delta_polar: f32) {
        self.viewer.orbit(delta_azimuth, delta_polar);
    }

    pub fn zoom(&mut self, scale: f32) {
        self.viewer.zoom(scale);
    }

    /// Call once per animation frame; returns whether the camera moved
    pub fn frame(&mut self) -> bool {
        self.viewer.frame()
    }

    pub fn status(&self) -> String {
        self.viewer.status().to_string()
    }

    pub fn camera_position(&self) -> Vec<f32> {
        let p = self.viewer.camera().position;
        vec![p.x, p.y, p.z]
    }

    pub fn camera_target(&self) -> Vec<f32> {
        let t = self.viewer.camera().target;
        vec![t.x, t.y, t.z]
    }

    pub fn positions(&self) -> Vec<f32> {
        self.viewer.scene().positions().to_vec()
    }

    pub fn normals(&self) -> Vec<f32> {
        self.viewer.scene().normals().to_vec()
    }

    pub fn scene_revision(&self) -> u32 {
        self.viewer.scene().revision()
    }

    #[cfg(target_arch = "wasm32")]
    fn mirror_status(&self) {
        let Some(id) = &self.status_element else {
            return;
        };
        let element = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(id));
        match element {
            Some(element) => element.set_text_content(Some(&self.status())),
            None => log::warn!("Status element #{id} not found"),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn mirror_status(&self) {
        if let Some(id) = &self.status_element {
            log::trace!("#{id}: {}", self.status());
        }
    }
}

/// Routes `log` records to the browser console
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&message),
            Level::Warn => web_sys::console::warn_1(&message),
            Level::Info => web_sys::console::info_1(&message),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // A second call only happens if the page already installed a logger
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::{Mesh, ModelFormat};

    fn cube_stl() -> Vec<u8> {
        let mesh = Mesh::cube(2.0);
        let mut data = vec![0u8; 80];
        data.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());
        for triangle in &mesh.triangles {
            let n = triangle.calculate_normal();
            let mut values = vec![n.x, n.y, n.z];
            for v in &triangle.vertices {
                values.extend_from_slice(&[v.position.x, v.position.y, v.position.z]);
            }
            for value in values {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn test_scene_flattens_and_replaces() {
        let mut scene = WebScene::default();
        let model = Model::from_mesh("cube", ModelFormat::Stl, Mesh::cube(2.0)).unwrap();

        let first = scene.add(&model);
        assert_eq!(scene.positions().len(), 12 * 3 * 3);
        assert_eq!(scene.normals().len(), scene.positions().len());

        let second = scene.add(&model);
        scene.remove(first);
        assert_eq!(scene.positions().len(), 108);

        scene.remove(second);
        assert!(scene.positions().is_empty());
        assert_eq!(scene.revision(), 3);
    }

    #[test]
    fn test_out_of_order_completion() {
        let mut viewer = WebViewer::new(None, None).unwrap();
        let first = viewer.begin_load("first.stl").unwrap();
        let second = viewer.begin_load("second.stl").unwrap();

        assert!(viewer.complete_load(second, &cube_stl()));
        assert!(!viewer.complete_load(first, &cube_stl()));
        assert_eq!(viewer.status(), "Loaded: second.stl");
        assert_eq!(viewer.scene_revision(), 1);
        assert_eq!(viewer.camera_target(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_failed_fetch_keeps_model() {
        let mut viewer = WebViewer::new(None, None).unwrap();
        let generation = viewer.begin_load("cube.stl").unwrap();
        assert!(viewer.complete_load(generation, &cube_stl()));
        let position = viewer.camera_position();

        let generation = viewer.begin_load("other.glb").unwrap();
        viewer.fail_load(generation, "network error");
        assert_eq!(viewer.status(), "Error loading model: load failed: network error");
        assert_eq!(viewer.camera_position(), position);
        assert!(!viewer.positions().is_empty());
    }
}
