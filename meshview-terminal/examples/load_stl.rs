/// Example: Load a model file and render it in the terminal
///
/// Usage: cargo run --example load_stl -- path/to/file.stl

use std::env;
use std::io;
use std::path::PathBuf;

use meshview_core::{FileLoader, LoadOutcome, Mesh, MeshSource, Model, ModelFormat, ViewerConfig};
use meshview_terminal::{to_io_error, TerminalApp};

fn main() -> io::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let mut app = TerminalApp::new(ViewerConfig::default())?;

    let Some(path) = args.get(1) else {
        eprintln!("Usage: {} <model-file>", args[0]);
        eprintln!("\nNo model file provided, using default cube...");
        let cube = Model::from_mesh("cube", ModelFormat::Stl, Mesh::cube(2.0)).map_err(to_io_error)?;
        app.show(cube)?;
        return app.run();
    };

    println!("Loading model file: {}", path);

    let source = MeshSource::Path(PathBuf::from(path));
    let outcome = pollster::block_on(app.viewer_mut().load(&FileLoader, source)).map_err(to_io_error)?;
    if let LoadOutcome::Failed(e) = outcome {
        return Err(to_io_error(e));
    }

    if let Some(model) = app.viewer().model() {
        println!("Loaded {} triangles", model.mesh.triangles.len());
    }
    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    app.run()
}
