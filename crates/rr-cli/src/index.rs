use std::fs;
use std::path::{Path, PathBuf};

use rr_compiler::{compile_file, CompileStats, RedirectOptions};
use rr_core::{Matcher, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// TypeScript module exporting `redirects`
    Ts,
}

/// Flags that override values from the options file.
#[derive(Debug, Default, Clone)]
pub struct OptionOverrides {
    pub csv: Option<PathBuf>,
    pub trailing_slash: bool,
    pub always_redirect: bool,
}

pub fn load_options(config: Option<&Path>, overrides: OptionOverrides) -> Result<RedirectOptions, String> {
    let mut options = match config {
        Some(path) => RedirectOptions::load(path).map_err(|e| e.to_string())?,
        None => RedirectOptions::default(),
    };

    if let Some(csv) = overrides.csv {
        options.csv = csv;
    }
    options.trailing_slash |= overrides.trailing_slash;
    options.always_redirect |= overrides.always_redirect;

    Ok(options)
}

pub fn compile_index(options: &RedirectOptions, verbose: bool) -> Result<(Snapshot, CompileStats), String> {
    let compilation = compile_file(options).map_err(|e| e.to_string())?;

    if verbose {
        for rejected in &compilation.rejected {
            println!("  line {}: {}", rejected.line, rejected.error);
        }
    }

    Ok((Snapshot::new(compilation.index), compilation.stats))
}

pub fn render(snapshot: &Snapshot, format: OutputFormat) -> Result<String, String> {
    let rendered = match format {
        OutputFormat::Json => snapshot.to_json(true),
        OutputFormat::Ts => snapshot.to_typescript_module(),
    };
    rendered.map_err(|e| format!("Failed to serialize index: {}", e))
}

pub fn write_index(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
        }
    }
    fs::write(path, contents)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
}

/// Read an index artifact and make sure every pattern in it compiles.
pub fn read_index(path: &Path) -> Result<Snapshot, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let snapshot = Snapshot::load(&text)
        .map_err(|e| format!("Invalid index: {}", e))?;
    Matcher::new(&snapshot.index)
        .map_err(|e| format!("Invalid index: {}", e))?;
    Ok(snapshot)
}
