use crate::{
    data::Simulation,
    error::{Error, Result},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const FIXTURE_EXTENSION: &str = "json";

/// Reads one fixture file.
pub fn load_simulation<P: AsRef<Path>>(path: P) -> Result<Simulation> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| Error::ReadSimulation {
        path: path.to_path_buf(),
        source,
    })?;

    let simulation: Simulation =
        serde_json::from_str(&contents).map_err(|source| Error::ParseSimulation {
            path: path.to_path_buf(),
            source,
        })?;

    debug!("loaded {} pairs from {}", simulation.len(), path.display());
    Ok(simulation)
}

/// Loads every `*.json` file of a directory, in filename order, as one
/// simulation. Subdirectories are skipped.
pub fn load_simulations_from_dir<P: AsRef<Path>>(dir: P) -> Result<Simulation> {
    let dir = dir.as_ref();
    let read_dir_error = |source| Error::ReadSimulationDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == FIXTURE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();

    let combined = concat_files(&files)?;
    info!(
        "loaded {} pairs from {} fixtures in {}",
        combined.len(),
        files.len(),
        dir.display()
    );
    Ok(combined)
}

/// Loads `files`, each resolved against `base_dir`, and concatenates their
/// pairs in the order given.
pub fn load_simulation_files<P: AsRef<Path>, S: AsRef<Path>>(
    base_dir: P,
    files: &[S],
) -> Result<Simulation> {
    let paths: Vec<PathBuf> = files
        .iter()
        .map(|file| base_dir.as_ref().join(file))
        .collect();

    concat_files(&paths)
}

/// Writes a fixture with two-space indentation, creating parent directories
/// as needed.
pub fn save_simulation<P: AsRef<Path>>(path: P, simulation: &Simulation) -> Result<()> {
    let path = path.as_ref();
    let mut contents = serde_json::to_string_pretty(simulation).map_err(Error::EncodeSimulation)?;
    contents.push('\n');

    let write_error = |source| Error::WriteSimulation {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)?;

    info!("saved {} pairs to {}", simulation.len(), path.display());
    Ok(())
}

fn concat_files(paths: &[PathBuf]) -> Result<Simulation> {
    let mut combined = Simulation::default();
    for path in paths {
        combined.extend(load_simulation(path)?);
    }
    Ok(combined)
}
