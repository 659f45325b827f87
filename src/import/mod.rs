use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ImportError;
use crate::models::Activity;

pub mod csv;

/// Trait for reading activities from a telemetry file format
pub trait ImportFormat: Send + Sync {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import activities from the file
    fn import_file(&self, file_path: &Path) -> Result<Vec<Activity>, ImportError>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Outcome of importing one file in a batch
#[derive(Debug)]
pub struct FileImportResult {
    pub file_path: PathBuf,
    pub result: Result<Vec<Activity>, ImportError>,
}

/// Dispatches files to the importer that understands them
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![Box::new(csv::CsvImporter::new())];
        Self { importers }
    }

    /// Import a single file, picking the importer by extension
    pub fn import_file(&self, file_path: &Path) -> Result<Vec<Activity>, ImportError> {
        let importer = self
            .importers
            .iter()
            .find(|importer| importer.can_import(file_path))
            .ok_or_else(|| ImportError::UnsupportedFormat {
                path: file_path.to_path_buf(),
            })?;

        debug!(
            file = %file_path.display(),
            format = importer.get_format_name(),
            "Importing"
        );
        importer.import_file(file_path)
    }

    /// Check if any importer accepts a given file
    pub fn can_import_file(&self, file_path: &Path) -> bool {
        self.importers.iter().any(|importer| importer.can_import(file_path))
    }

    /// Collect all importable files from a directory, sorted by path
    pub fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>, ImportError> {
        if !dir_path.is_dir() {
            return Err(ImportError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Path is not a directory: {}", dir_path.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.is_file() && self.can_import_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        Ok(files)
    }

    /// Import files in parallel; results come back in input order
    pub fn import_files(&self, file_paths: &[PathBuf], show_progress: bool) -> Vec<FileImportResult> {
        info!("Starting parallel import of {} files", file_paths.len());

        let progress = if show_progress {
            let pb = ProgressBar::new(file_paths.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };

        let results: Vec<FileImportResult> = file_paths
            .par_iter()
            .map(|file_path| {
                let result = self.import_file(file_path);
                if let Err(e) = &result {
                    warn!(file = %file_path.display(), error = %e, "Import failed");
                }
                if let Some(pb) = &progress {
                    pb.set_message(
                        file_path
                            .file_name()
                            .unwrap_or_default()
                            .to_string_lossy()
                            .to_string(),
                    );
                    pb.inc(1);
                }
                FileImportResult {
                    file_path: file_path.clone(),
                    result,
                }
            })
            .collect();

        if let Some(pb) = progress {
            pb.finish_with_message("Import complete");
        }

        let failed = results.iter().filter(|r| r.result.is_err()).count();
        info!(
            total = results.len(),
            failed, "Parallel import finished"
        );

        results
    }

    /// Import every supported file in a directory
    pub fn import_directory(
        &self,
        dir_path: &Path,
        show_progress: bool,
    ) -> Result<Vec<FileImportResult>, ImportError> {
        let files = self.collect_importable_files(dir_path)?;
        if files.is_empty() {
            warn!("No importable files found in {}", dir_path.display());
        }
        Ok(self.import_files(&files, show_progress))
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
