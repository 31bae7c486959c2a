/// meshview terminal viewer
///
/// Usage: meshview-terminal [--config viewer.json] [model files...]
/// Controls:
///   - 1-9: Load a model from the list
///   - C: Center view
///   - WASD / Arrow Keys: Orbit
///   - +/-: Zoom
///   - Q/ESC: Quit

use std::env;
use std::io;
use std::path::Path;

use meshview_core::{Mesh, Model, ModelEntry, ModelFormat, ViewerConfig};
use meshview_terminal::{to_io_error, TerminalApp};

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut config_path = None;
    let mut files = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => match args.next() {
                Some(path) => config_path = Some(path),
                None => {
                    eprintln!("--config needs a file argument");
                    std::process::exit(2);
                }
            },
            "--help" | "-h" => {
                println!("Usage: meshview-terminal [--config viewer.json] [model files...]");
                return Ok(());
            }
            _ => files.push(arg),
        }
    }

    let mut config = match config_path {
        Some(path) => ViewerConfig::load(Path::new(&path)).map_err(to_io_error)?,
        None => ViewerConfig::default(),
    };

    // Files given on the command line go first, so `1` picks the first one
    if !files.is_empty() {
        let mut models: Vec<ModelEntry> = files
            .into_iter()
            .map(|file| ModelEntry {
                name: Path::new(&file)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.clone()),
                file,
            })
            .collect();
        models.append(&mut config.models);
        config.models = models;
    }

    let has_models = config
        .models
        .first()
        .is_some_and(|entry| Path::new(&entry.file).exists());

    let mut app = TerminalApp::new(config)?;
    if has_models {
        app.request_load(0);
    } else {
        log::info!("No model file found, showing the demo cube");
        let cube = Model::from_mesh("cube", ModelFormat::Stl, Mesh::cube(2.0)).map_err(to_io_error)?;
        app.show(cube)?;
    }

    app.run()
}
