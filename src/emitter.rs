//! YAML output: one file per cube, one per view, and an index.

use crate::schema::DomainTag;
use crate::semantic_model::{CubeDocument, CubeModel, ViewDocument, ViewModel};
use log::{info, warn};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CUBES_DIR: &str = "cubes";
pub const VIEWS_DIR: &str = "views";
pub const INDEX_FILE: &str = "README.md";
pub const SUMMARY_FILE: &str = "generation_summary.json";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("could not create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("could not write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("could not serialize {name}: {reason}")]
    Serialize { name: String, reason: String },
    #[error("could not back up {}: {source}", .path.display())]
    Backup { path: PathBuf, source: io::Error },
}

pub fn render_cube(cube: &CubeModel) -> Result<String, WriteError> {
    serde_yaml::to_string(&CubeDocument { cubes: vec![cube] }).map_err(|e| {
        WriteError::Serialize {
            name: cube.name.clone(),
            reason: e.to_string(),
        }
    })
}

pub fn render_view(view: &ViewModel) -> Result<String, WriteError> {
    serde_yaml::to_string(&ViewDocument { views: vec![view] }).map_err(|e| {
        WriteError::Serialize {
            name: view.name.clone(),
            reason: e.to_string(),
        }
    })
}

/// Markdown index of the generated files. Contains nothing run-specific so
/// repeated runs produce identical bytes.
pub fn render_index(domain: DomainTag, cubes: &[CubeModel], views: &[ViewModel]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Generated Cube Models\n");
    let _ = writeln!(out, "Domain: {}\n", domain);
    let _ = writeln!(out, "## Cubes\n");
    let _ = writeln!(out, "| Cube | Table | Type | Measures | Dimensions | Joins |");
    let _ = writeln!(out, "|------|-------|------|----------|------------|-------|");
    for cube in cubes {
        let _ = writeln!(
            out,
            "| [{name}]({dir}/{name}.yml) | {table} | {kind} | {m} | {d} | {j} |",
            name = cube.name,
            dir = CUBES_DIR,
            table = cube.sql_table,
            kind = cube.classification,
            m = cube.measures.len(),
            d = cube.dimensions.len(),
            j = cube.joins.len(),
        );
    }
    if !views.is_empty() {
        let _ = writeln!(out, "\n## Views\n");
        for view in views {
            let _ = writeln!(
                out,
                "- [{name}]({dir}/{name}.yml): {description}",
                name = view.name,
                dir = VIEWS_DIR,
                description = view.description
            );
        }
    }
    out
}

/// Outcome of writing every unit; failed units do not stop the rest.
#[derive(Debug, Default)]
pub struct EmitReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<WriteError>,
}

impl EmitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, result: Result<PathBuf, WriteError>) {
        match result {
            Ok(path) => self.written.push(path),
            Err(e) => {
                warn!("{}", e);
                self.failures.push(e);
            }
        }
    }
}

pub struct Emitter {
    output_dir: PathBuf,
}

impl Emitter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Emitter {
            output_dir: output_dir.into(),
        }
    }

    pub fn cube_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(CUBES_DIR).join(format!("{}.yml", name))
    }

    pub fn view_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(VIEWS_DIR).join(format!("{}.yml", name))
    }

    /// Writes cubes, then views, then the index. Earlier writes stay in
    /// place when a later one fails.
    pub fn emit(&self, domain: DomainTag, cubes: &[CubeModel], views: &[ViewModel]) -> EmitReport {
        let mut report = EmitReport::default();

        let cubes_ready = self.ensure_dir(CUBES_DIR);
        for cube in cubes {
            let path = self.cube_path(&cube.name);
            let result = match &cubes_ready {
                Ok(()) => render_cube(cube).and_then(|yaml| write_file(&path, &yaml)),
                Err(reason) => Err(dir_failure(&path, reason)),
            };
            report.record(result);
        }

        if !views.is_empty() {
            let views_ready = self.ensure_dir(VIEWS_DIR);
            for view in views {
                let path = self.view_path(&view.name);
                let result = match &views_ready {
                    Ok(()) => render_view(view).and_then(|yaml| write_file(&path, &yaml)),
                    Err(reason) => Err(dir_failure(&path, reason)),
                };
                report.record(result);
            }
        }

        let index = render_index(domain, cubes, views);
        report.record(write_file(&self.output_dir.join(INDEX_FILE), &index));

        info!(
            "Wrote {} files to {} ({} failed)",
            report.written.len(),
            self.output_dir.display(),
            report.failures.len()
        );
        report
    }

    /// Moves every `*.yml` under `cubes/` and `views/` into
    /// `backup_<stamp>/`, keeping the same layout. Returns the backup
    /// directory when anything was moved.
    pub fn backup_existing(&self, stamp: &str) -> Result<Option<PathBuf>, WriteError> {
        let backup_dir = self.output_dir.join(format!("backup_{}", stamp));
        let backup_error = |path: &Path, e: io::Error| WriteError::Backup {
            path: path.to_path_buf(),
            source: e,
        };
        let mut moved = 0;
        for group in [CUBES_DIR, VIEWS_DIR] {
            let dir = self.output_dir.join(group);
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&dir).map_err(|e| backup_error(&dir, e))? {
                let path = entry.map_err(|e| backup_error(&dir, e))?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("yml") {
                    continue;
                }
                let Some(file_name) = path.file_name() else {
                    continue;
                };
                let target_dir = backup_dir.join(group);
                fs::create_dir_all(&target_dir).map_err(|e| WriteError::CreateDir {
                    path: target_dir.clone(),
                    source: e,
                })?;
                fs::rename(&path, target_dir.join(file_name))
                    .map_err(|e| backup_error(&path, e))?;
                moved += 1;
            }
        }

        if moved == 0 {
            return Ok(None);
        }
        info!("Backed up {} files to {}", moved, backup_dir.display());
        Ok(Some(backup_dir))
    }

    pub fn emit_summary<T: Serialize>(&self, summary: &T) -> Result<PathBuf, WriteError> {
        let path = self.output_dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary).map_err(|e| WriteError::Serialize {
            name: SUMMARY_FILE.to_string(),
            reason: e.to_string(),
        })?;
        write_file(&path, &json)
    }

    fn ensure_dir(&self, group: &str) -> Result<(), String> {
        let dir = self.output_dir.join(group);
        fs::create_dir_all(&dir).map_err(|e| {
            let err = WriteError::CreateDir {
                path: dir.clone(),
                source: e,
            };
            warn!("{}", err);
            err.to_string()
        })
    }
}

fn dir_failure(path: &Path, reason: &str) -> WriteError {
    WriteError::Write {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::Other, reason.to_string()),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<PathBuf, WriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| WriteError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, contents).map_err(|e| WriteError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(path.to_path_buf())
}
