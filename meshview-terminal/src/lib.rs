/// Terminal host for the mesh viewer
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use meshview_core::{
    FileLoader, LoadTicket, MeshSource, Model, ModelEntry, Result as ViewerResult, Viewer,
    ViewerConfig, ViewerError,
};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Rows taken by the header and status lines
const OVERLAY_ROWS: u16 = 2;
/// Orbit step per key press, in radians
const ORBIT_STEP: f32 = 0.15;
const ZOOM_STEP: f32 = 1.15;

type Completion = (LoadTicket, ViewerResult<Vec<u8>>);

/// Turn a viewer error into the I/O error the terminal loop speaks
pub fn to_io_error(error: ViewerError) -> io::Error {
    let kind = match error {
        ViewerError::LoadFailure(_) => io::ErrorKind::NotFound,
        ViewerError::UnsupportedFormat(_) | ViewerError::InvalidParameter(_) | ViewerError::Config(_) => {
            io::ErrorKind::InvalidInput
        }
        ViewerError::InvalidGeometry(_) => io::ErrorKind::InvalidData,
    };
    io::Error::new(kind, error.to_string())
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    viewer: Viewer<AsciiRenderer>,
    models: Vec<ModelEntry>,
    completions: (Sender<Completion>, Receiver<Completion>),
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: ViewerConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Self::with_size(config, width, height)
    }

    pub fn with_size(config: ViewerConfig, width: u16, height: u16) -> io::Result<Self> {
        let rows = height.saturating_sub(OVERLAY_ROWS).max(1);
        let renderer = AsciiRenderer::new(width as usize, rows as usize, &config);
        let models = config.models.clone();
        let viewer =
            Viewer::new(config, renderer, width as u32, cell_height(rows)).map_err(to_io_error)?;

        Ok(Self {
            viewer,
            models,
            completions: mpsc::channel(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn viewer(&self) -> &Viewer<AsciiRenderer> {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut Viewer<AsciiRenderer> {
        &mut self.viewer
    }

    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    /// Display an already built model, e.g. the demo cube
    pub fn show(&mut self, model: Model) -> io::Result<()> {
        self.viewer.show_model(model).map_err(to_io_error)
    }

    /// Start loading entry `index` of the model list on a worker thread.
    ///
    /// The result is picked up by [`TerminalApp::poll_loads`]; a newer
    /// request makes older results stale no matter which finishes first.
    pub fn request_load(&mut self, index: usize) {
        let Some(entry) = self.models.get(index) else {
            return;
        };
        let ticket = match self.viewer.begin_load(&entry.file) {
            Ok(ticket) => ticket,
            // Status line already carries the error
            Err(_) => return,
        };

        let source = MeshSource::Path(PathBuf::from(&entry.file));
        let sender = self.completions.0.clone();
        thread::spawn(move || {
            let fetched = FileLoader::read(&source);
            // The receiver only goes away when the app shuts down
            let _ = sender.send((ticket, fetched));
        });
    }

    /// Apply every finished load, in completion order
    pub fn poll_loads(&mut self) -> usize {
        let mut applied = 0;
        while let Ok((ticket, fetched)) = self.completions.1.try_recv() {
            self.viewer.finish_load(ticket, fetched);
            applied += 1;
        }
        applied
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            // Finished loads
            self.poll_loads();

            // Render
            self.viewer.frame();
            self.draw()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                self.handle_key(code)
            }
            Event::Resize(width, height) => self.resize(width, height),
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char(c @ '1'..='9') => {
                self.request_load(c as usize - '1' as usize);
            }
            KeyCode::Char('c') => {
                if let Err(e) = self.viewer.center_view() {
                    log::warn!("Cannot center view: {e}");
                }
            }
            KeyCode::Char('w') | KeyCode::Up => self.viewer.orbit(0.0, -ORBIT_STEP),
            KeyCode::Char('s') | KeyCode::Down => self.viewer.orbit(0.0, ORBIT_STEP),
            KeyCode::Char('a') | KeyCode::Left => self.viewer.orbit(-ORBIT_STEP, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.viewer.orbit(ORBIT_STEP, 0.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.viewer.zoom(1.0 / ZOOM_STEP),
            KeyCode::Char('-') => self.viewer.zoom(ZOOM_STEP),
            _ => {}
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        let rows = height.saturating_sub(OVERLAY_ROWS).max(1);
        self.viewer.scene_mut().resize(width as usize, rows as usize);
        self.viewer.resize(width as u32, cell_height(rows));
    }

    fn draw(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 1))?;

        self.viewer.scene().draw(&mut stdout)?;

        // Draw UI overlay
        let (_, height) = terminal::size()?;
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "meshview | FPS: {:.1} | 1-{} Model  WASD/Arrows Orbit  +/- Zoom  C Center  Q Quit",
                self.fps,
                self.models.len().clamp(1, 9)
            )),
            cursor::MoveTo(0, height.saturating_sub(1)),
            Clear(ClearType::CurrentLine),
            Print(self.viewer.status().to_string()),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Terminal cells are roughly twice as tall as they are wide
fn cell_height(rows: u16) -> u32 {
    rows as u32 * 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::{LoadOutcome, Mesh, ModelFormat, StatusMessage};

    fn app(models: Vec<ModelEntry>) -> TerminalApp {
        let config = ViewerConfig {
            models,
            ..ViewerConfig::default()
        };
        TerminalApp::with_size(config, 80, 24).unwrap()
    }

    fn wait_for_completion(app: &mut TerminalApp) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.poll_loads() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_missing_file_reports_load_failure() {
        let mut app = app(vec![ModelEntry {
            name: "Missing".to_string(),
            file: "/no/such/model.stl".to_string(),
        }]);
        app.request_load(0);
        wait_for_completion(&mut app);
        assert!(matches!(app.viewer().status(), StatusMessage::Error(_)));
        assert!(app.viewer().model().is_none());
    }

    #[test]
    fn test_unsupported_entry_never_spawns() {
        let mut app = app(vec![ModelEntry {
            name: "Teapot".to_string(),
            file: "teapot.obj".to_string(),
        }]);
        app.request_load(0);
        app.request_load(7);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(app.poll_loads(), 0);
        assert!(matches!(app.viewer().status(), StatusMessage::Error(_)));
    }

    #[test]
    fn test_demo_cube_and_keys() {
        let mut app = app(Vec::new());
        let cube = Model::from_mesh("cube", ModelFormat::Stl, Mesh::cube(2.0)).unwrap();
        app.show(cube).unwrap();
        assert!(app.viewer().scene().has_object());

        let before = app.viewer().camera().pose();
        app.handle_key(KeyCode::Right);
        app.viewer_mut().frame();
        assert_ne!(app.viewer().camera().pose(), before);

        app.handle_key(KeyCode::Char('c'));
        app.handle_event(Event::Resize(100, 40));
        assert!((app.viewer().camera().aspect - 100.0 / 76.0).abs() < 1e-5);

        app.handle_key(KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut app = app(Vec::new());
        let old = app.viewer_mut().begin_load("old.stl").unwrap();
        let _new = app.viewer_mut().begin_load("new.stl").unwrap();
        let outcome = app.viewer_mut().finish_load(old, Ok(Vec::new()));
        assert_eq!(outcome, LoadOutcome::Stale);
    }
}
