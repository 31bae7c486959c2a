/// The viewer controller: owns camera, controls, the displayed model and
/// the load generations, and drives a [`Scene`]
use std::fmt;

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::fit::{CameraPose, ViewFitter};
use crate::format::ModelFormat;
use crate::loader::{LoadTicket, LoadTracker, MeshLoader, MeshSource};
use crate::orbit::OrbitControls;
use crate::projection::Camera;
use crate::scene::{Model, ObjectId, Scene};

/// User-visible status line
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    Idle,
    Loading(String),
    Loaded(String),
    Error(String),
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Idle => write!(f, "No model loaded"),
            StatusMessage::Loading(name) => write!(f, "Loading {name}..."),
            StatusMessage::Loaded(name) => write!(f, "Loaded: {name}"),
            StatusMessage::Error(message) => write!(f, "Error loading model: {message}"),
        }
    }
}

/// What happened to a completed load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The model replaced whatever was displayed
    Applied,
    /// A newer load was requested meanwhile; the result was dropped
    Stale,
    /// The load failed; the previous model is still displayed
    Failed(ViewerError),
}

struct Displayed {
    model: Model,
    object: ObjectId,
}

/// Single owner of all viewer state
pub struct Viewer<S: Scene> {
    config: ViewerConfig,
    scene: S,
    camera: Camera,
    controls: OrbitControls,
    tracker: LoadTracker,
    current: Option<Displayed>,
    status: StatusMessage,
}

impl<S: Scene> Viewer<S> {
    pub fn new(config: ViewerConfig, scene: S, width: u32, height: u32) -> Result<Self> {
        config.validate()?;

        let mut camera = Camera::new(width, height);
        camera.fov = config.fov_degrees.to_radians();
        camera.near = config.near;
        camera.far = config.far;
        camera.position = config.initial_camera();

        let mut controls = OrbitControls::new(&camera);
        controls.damping_factor = config.damping_factor;
        controls.enable_damping = config.damping_factor > 0.0;

        Ok(Self {
            config,
            scene,
            camera,
            controls,
            tracker: LoadTracker::new(),
            current: None,
            status: StatusMessage::Idle,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn status(&self) -> &StatusMessage {
        &self.status
    }

    pub fn model(&self) -> Option<&Model> {
        self.current.as_ref().map(|d| &d.model)
    }

    /// Start loading `name`.
    ///
    /// Unsupported extensions fail here, before any fetch is attempted, and
    /// leave in-flight loads untouched.
    pub fn begin_load(&mut self, name: &str) -> Result<LoadTicket> {
        let format = match ModelFormat::from_name(name) {
            Ok(format) => format,
            Err(e) => {
                log::warn!("Rejected {name}: {e}");
                self.status = StatusMessage::Error(e.to_string());
                return Err(e);
            }
        };
        let ticket = self.tracker.begin(name, format);
        log::info!("Loading {name} as {format} (generation {})", ticket.generation);
        self.status = StatusMessage::Loading(name.to_string());
        Ok(ticket)
    }

    /// Complete a load started with [`Viewer::begin_load`]
    pub fn finish_load(&mut self, ticket: LoadTicket, fetched: Result<Vec<u8>>) -> LoadOutcome {
        if !self.tracker.is_current(&ticket) {
            log::debug!(
                "Discarding {} (generation {}, latest {})",
                ticket.name,
                ticket.generation,
                self.tracker.latest()
            );
            return LoadOutcome::Stale;
        }

        let shown = fetched
            .and_then(|bytes| Model::from_bytes(&ticket.name, ticket.format, &bytes))
            .and_then(|model| self.show(model));
        match shown {
            Ok(()) => LoadOutcome::Applied,
            Err(e) => {
                log::warn!("Failed to load {}: {e}", ticket.name);
                self.status = StatusMessage::Error(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Fetch and display `source` in one step
    pub async fn load<L: MeshLoader>(&mut self, loader: &L, source: MeshSource) -> Result<LoadOutcome> {
        let ticket = self.begin_load(&source.name())?;
        let fetched = loader.fetch(&source).await;
        Ok(self.finish_load(ticket, fetched))
    }

    /// Show an already parsed mesh, superseding any in-flight load
    pub fn show_model(&mut self, model: Model) -> Result<()> {
        self.tracker.begin(&model.name, model.format);
        self.show(model).inspect_err(|e| {
            self.status = StatusMessage::Error(e.to_string());
        })
    }

    fn show(&mut self, model: Model) -> Result<()> {
        // Fresh model, fresh framing from the default direction
        let pose = ViewFitter::default().fit(
            &model.bounds,
            self.camera.fov_degrees(),
            self.camera.aspect,
            self.config.margin,
        )?;

        if let Some(previous) = self.current.take() {
            self.scene.remove(previous.object);
        }
        let object = self.scene.add(&model);
        log::info!(
            "Showing {} ({} triangles, max dimension {:.3}, camera distance {:.3})",
            model.name,
            model.mesh.triangles.len(),
            model.bounds.max_dimension(),
            pose.distance()
        );

        self.status = StatusMessage::Loaded(model.name.clone());
        self.current = Some(Displayed { model, object });
        self.apply(&pose);
        Ok(())
    }

    /// Re-frame the current model, keeping the current viewing direction
    pub fn center_view(&mut self) -> Result<CameraPose> {
        let bounds = self
            .current
            .as_ref()
            .map(|d| d.model.bounds)
            .ok_or_else(|| ViewerError::InvalidGeometry("no model loaded".to_string()))?;
        let pose = ViewFitter::from_camera(&self.camera).fit(
            &bounds,
            self.camera.fov_degrees(),
            self.camera.aspect,
            self.config.margin,
        )?;
        self.apply(&pose);
        Ok(pose)
    }

    fn apply(&mut self, pose: &CameraPose) {
        // Clip planes start from the configured values for every framing
        self.camera.near = self.config.near;
        self.camera.far = self.config.far;
        self.camera.apply_pose(pose);
        self.controls.reset(pose);
    }

    /// Window resize handler
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    pub fn orbit(&mut self, delta_azimuth: f32, delta_polar: f32) {
        self.controls.rotate(delta_azimuth, delta_polar);
    }

    pub fn zoom(&mut self, scale: f32) {
        self.controls.zoom(scale);
    }

    /// Per-frame tick: advance the controls, then render.
    ///
    /// Returns whether the camera moved this frame.
    pub fn frame(&mut self) -> bool {
        let moved = self.controls.update(&mut self.camera);
        self.scene.render(&self.camera);
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use std::collections::HashMap;
    use std::future::Future;

    #[derive(Default)]
    struct RecordingScene {
        next_id: ObjectId,
        objects: HashMap<ObjectId, String>,
        added: Vec<String>,
        frames: usize,
    }

    impl Scene for RecordingScene {
        fn add(&mut self, model: &Model) -> ObjectId {
            self.next_id += 1;
            self.objects.insert(self.next_id, model.name.clone());
            self.added.push(model.name.clone());
            self.next_id
        }

        fn remove(&mut self, id: ObjectId) {
            self.objects.remove(&id);
        }

        fn render(&mut self, _camera: &Camera) {
            self.frames += 1;
        }
    }

    struct MemoryLoader(HashMap<String, Vec<u8>>);

    impl MeshLoader for MemoryLoader {
        fn fetch(&self, source: &MeshSource) -> impl Future<Output = Result<Vec<u8>>> {
            let name = source.name();
            let result = self
                .0
                .get(&name)
                .cloned()
                .ok_or_else(|| ViewerError::LoadFailure(format!("404: {name}")));
            async move { result }
        }
    }

    /// Binary STL of an axis-aligned cube of the given size at `offset`
    fn cube_stl(size: f32, offset: f32) -> Vec<u8> {
        let mut mesh = Mesh::cube(size);
        mesh.translate(&nalgebra::Vector3::new(offset, offset, offset));

        let mut data = vec![0u8; 80];
        data.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());
        for triangle in &mesh.triangles {
            let normal = triangle.calculate_normal();
            let mut values = vec![normal.x, normal.y, normal.z];
            for vertex in &triangle.vertices {
                values.extend_from_slice(&[vertex.position.x, vertex.position.y, vertex.position.z]);
            }
            for value in values {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    fn viewer() -> Viewer<RecordingScene> {
        Viewer::new(ViewerConfig::default(), RecordingScene::default(), 800, 800).unwrap()
    }

    fn displayed(viewer: &Viewer<RecordingScene>) -> Vec<String> {
        let mut names: Vec<String> = viewer.scene().objects.values().cloned().collect();
        names.sort();
        names
    }

    #[test]
    fn test_load_centers_and_fits() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("reactor.stl").unwrap();
        assert_eq!(viewer.status().to_string(), "Loading reactor.stl...");

        let outcome = viewer.finish_load(ticket, Ok(cube_stl(2.0, 40.0)));
        assert_eq!(outcome, LoadOutcome::Applied);
        assert_eq!(viewer.status().to_string(), "Loaded: reactor.stl");

        let camera = viewer.camera();
        assert!((camera.target - nalgebra::Point3::origin()).norm() < 1e-4);
        let expected = 2.0 / 30f32.to_radians().tan();
        assert!(((camera.position - camera.target).norm() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_second_request_wins_when_it_finishes_first() {
        let mut viewer = viewer();
        let first = viewer.begin_load("first.stl").unwrap();
        let second = viewer.begin_load("second.stl").unwrap();

        assert_eq!(viewer.finish_load(second, Ok(cube_stl(2.0, 0.0))), LoadOutcome::Applied);
        assert_eq!(viewer.finish_load(first, Ok(cube_stl(4.0, 0.0))), LoadOutcome::Stale);

        assert_eq!(viewer.scene().added, vec!["second.stl".to_string()]);
        assert_eq!(displayed(&viewer), vec!["second.stl".to_string()]);
        assert_eq!(viewer.status().to_string(), "Loaded: second.stl");
    }

    #[test]
    fn test_second_request_wins_when_it_finishes_last() {
        let mut viewer = viewer();
        let first = viewer.begin_load("first.stl").unwrap();
        let second = viewer.begin_load("second.stl").unwrap();

        assert_eq!(viewer.finish_load(first, Ok(cube_stl(4.0, 0.0))), LoadOutcome::Stale);
        assert_eq!(viewer.status().to_string(), "Loading second.stl...");
        assert_eq!(viewer.finish_load(second, Ok(cube_stl(2.0, 0.0))), LoadOutcome::Applied);

        assert_eq!(viewer.scene().added, vec!["second.stl".to_string()]);
        assert_eq!(displayed(&viewer), vec!["second.stl".to_string()]);
    }

    #[test]
    fn test_new_model_replaces_previous() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("a.stl").unwrap();
        viewer.finish_load(ticket, Ok(cube_stl(2.0, 0.0)));
        let ticket = viewer.begin_load("b.stl").unwrap();
        viewer.finish_load(ticket, Ok(cube_stl(6.0, 0.0)));

        assert_eq!(displayed(&viewer), vec!["b.stl".to_string()]);
        assert_eq!(viewer.model().unwrap().name, "b.stl");
    }

    #[test]
    fn test_failures_keep_previous_model() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("good.stl").unwrap();
        viewer.finish_load(ticket, Ok(cube_stl(2.0, 0.0)));
        let pose = viewer.camera().pose();

        let ticket = viewer.begin_load("broken.stl").unwrap();
        let outcome = viewer.finish_load(ticket, Ok(vec![0u8; 12]));
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::InvalidGeometry(_))));

        let ticket = viewer.begin_load("offline.glb").unwrap();
        let outcome = viewer.finish_load(ticket, Err(ViewerError::LoadFailure("timeout".to_string())));
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::LoadFailure(_))));

        assert_eq!(displayed(&viewer), vec!["good.stl".to_string()]);
        assert_eq!(viewer.camera().pose(), pose);
        assert!(matches!(viewer.status(), StatusMessage::Error(_)));
    }

    #[test]
    fn test_degenerate_model_is_invalid_geometry() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("point.stl").unwrap();
        let outcome = viewer.finish_load(ticket, Ok(cube_stl(0.0, 3.0)));
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::InvalidGeometry(_))));
        assert!(viewer.model().is_none());
    }

    #[test]
    fn test_unsupported_format_does_not_cancel_in_flight_load() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("model.stl").unwrap();

        let rejected = viewer.begin_load("model.obj");
        assert!(matches!(rejected, Err(ViewerError::UnsupportedFormat(_))));
        assert!(matches!(viewer.status(), StatusMessage::Error(_)));

        assert_eq!(viewer.finish_load(ticket, Ok(cube_stl(2.0, 0.0))), LoadOutcome::Applied);
    }

    #[test]
    fn test_async_load_through_loader() {
        let mut files = HashMap::new();
        files.insert("cube.stl".to_string(), cube_stl(2.0, 0.0));
        let loader = MemoryLoader(files);
        let mut viewer = viewer();

        let source = MeshSource::Url("cube.stl".to_string());
        let outcome = pollster::block_on(viewer.load(&loader, source)).unwrap();
        assert_eq!(outcome, LoadOutcome::Applied);

        let missing = MeshSource::Url("missing.stl".to_string());
        let outcome = pollster::block_on(viewer.load(&loader, missing)).unwrap();
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::LoadFailure(_))));
        assert_eq!(viewer.model().unwrap().name, "cube.stl");
    }

    #[test]
    fn test_center_view_keeps_direction() {
        let mut viewer = viewer();
        assert!(matches!(viewer.center_view(), Err(ViewerError::InvalidGeometry(_))));

        let ticket = viewer.begin_load("cube.stl").unwrap();
        viewer.finish_load(ticket, Ok(cube_stl(2.0, 0.0)));

        viewer.orbit(1.0, 0.3);
        viewer.zoom(5.0);
        for _ in 0..300 {
            viewer.frame();
        }
        let direction = viewer.camera().pose().view_direction().unwrap();

        let pose = viewer.center_view().unwrap();
        assert!((pose.view_direction().unwrap() - direction).norm() < 1e-4);
        assert!((pose.distance() - 2.0 / 30f32.to_radians().tan()).abs() < 1e-3);
        assert_eq!(viewer.camera().pose(), pose);
        assert!(viewer.scene().frames >= 300);
    }

    #[test]
    fn test_tiny_model_is_not_clipped_by_near_plane() {
        let mut viewer = viewer();
        let tiny = Model::from_mesh("tiny.stl", ModelFormat::Stl, Mesh::cube(0.05)).unwrap();
        viewer.show_model(tiny).unwrap();

        let camera = viewer.camera().clone();
        assert!(camera.near < viewer.config().near);
        let corners = viewer.model().unwrap().bounds.corners();
        let visible = corners.iter().filter(|c| camera.project_to_ndc(c).is_some()).count();
        assert_eq!(visible, 8);

        // A large model afterwards gets the configured near plane back
        let large = Model::from_mesh("large.stl", ModelFormat::Stl, Mesh::cube(50.0)).unwrap();
        viewer.show_model(large).unwrap();
        assert_eq!(viewer.camera().near, viewer.config().near);
    }

    #[test]
    fn test_resize_widens_framing_for_portrait() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("cube.stl").unwrap();
        viewer.finish_load(ticket, Ok(cube_stl(2.0, 0.0)));
        let square = viewer.camera().pose().distance();

        viewer.resize(400, 800);
        let portrait = viewer.center_view().unwrap().distance();
        assert!(portrait > square);
    }
}
