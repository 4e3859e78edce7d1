// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parallel batch runner. Sessions share nothing mutable, so each one runs
//! on its own rayon worker and fails on its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use sketchmap_scoring::ScoreTable;

use crate::artifacts::ArtifactStore;
use crate::config::PipelineConfig;
use crate::error::{SessionError, Stage, StageError};
use crate::pipeline::{Pipeline, SessionOutput};
use crate::session::SessionId;

/// Outcome of a batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<SessionOutput>,
    pub failed: Vec<SessionError>,
    /// Records of every completed session
    pub table: ScoreTable,
    /// Per-family CSV files written for the batch
    pub tables: Vec<PathBuf>,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

fn is_mesh_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("obj"))
}

/// Expand directories into their `.obj` files; files are kept as given.
/// The result is sorted and free of duplicates.
pub fn collect_inputs(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in std::fs::read_dir(path)? {
                let entry = entry?.path();
                if entry.is_file() && is_mesh_file(&entry) {
                    inputs.push(entry);
                }
            }
        } else {
            inputs.push(path.clone());
        }
    }
    inputs.sort();
    inputs.dedup();
    Ok(inputs)
}

/// Session ids seen more than once; later occurrences are rejected
fn duplicate_sessions(inputs: &[PathBuf]) -> Vec<bool> {
    let mut seen: FxHashSet<SessionId> = FxHashSet::default();
    inputs
        .iter()
        .map(|path| match SessionId::from_path(path) {
            Ok(id) => !seen.insert(id),
            Err(_) => false,
        })
        .collect()
}

/// Run every input through the pipeline.
///
/// Sessions run in parallel on `config.worker_threads()` workers. A failed
/// session is recorded and the rest carry on. Per-family score tables for
/// the completed sessions are written to the store at the end.
pub fn run_batch(inputs: &[PathBuf], config: &PipelineConfig, store: &ArtifactStore) -> BatchReport {
    let start = Instant::now();
    let pipeline = Pipeline::new(Arc::new(config.clone()), store.clone());
    let duplicates = duplicate_sessions(inputs);

    tracing::info!(
        sessions = inputs.len(),
        workers = config.worker_threads(),
        output = %store.root().display(),
        "batch started"
    );

    let run = |(path, duplicate): (&PathBuf, &bool)| {
        if *duplicate {
            let session = path.display().to_string();
            tracing::error!(session = %session, stage = %Stage::Load, "duplicate session in batch");
            return Err(SessionError {
                session: session.clone(),
                stage: Stage::Load,
                source: StageError::DuplicateSession(session),
            });
        }
        pipeline.run_session(path)
    };

    let results: Vec<Result<SessionOutput, SessionError>> =
        match rayon::ThreadPoolBuilder::new().num_threads(config.worker_threads()).build() {
            Ok(pool) => pool.install(|| inputs.par_iter().zip(duplicates.par_iter()).map(run).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "could not build worker pool, using the global pool");
                inputs.par_iter().zip(duplicates.par_iter()).map(run).collect()
            }
        };

    let mut report = BatchReport::default();
    for result in results {
        match result {
            Ok(output) => {
                report.table.extend(output.table.records.iter().cloned());
                report.completed.push(output);
            }
            Err(err) => report.failed.push(err),
        }
    }

    match store.write_family_tables(&report.table) {
        Ok(paths) => report.tables = paths,
        Err(e) => tracing::error!(error = %e, "failed to write batch score tables"),
    }

    report.elapsed_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        records = report.table.len(),
        elapsed_ms = report.elapsed_ms,
        "batch complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_1.obj", "a_0.OBJ", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let extra = dir.path().join("b_1.obj");
        let inputs = collect_inputs(&[dir.path().to_path_buf(), extra]).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a_0.OBJ", "b_1.obj"]);
    }

    #[test]
    fn test_duplicates_flag_later_inputs() {
        let inputs = vec![
            PathBuf::from("x/adel_1.obj"),
            PathBuf::from("y/adel_1.obj"),
            PathBuf::from("y/mona_1.obj"),
            PathBuf::from("y/broken.obj"),
        ];
        assert_eq!(duplicate_sessions(&inputs), vec![false, true, false, false]);
    }
}
