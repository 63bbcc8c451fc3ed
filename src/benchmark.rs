//! Run-mode materialization of synthetic benchmarks.
//!
//! Describing a workflow only renders its document. Running one also needs
//! the CPU-affinity lock files the benchmark program coordinates through, and
//! a random payload standing in for the first task's input file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::topology::{GeneratorConfig, Topology};
use crate::workflow::{document, Workflow, WorkflowMeta};
use crate::{wlog, wlog_debug, wlog_warn, Error, Result};

pub const DATA_DIR: &str = "data";
const LOCK_FILE: &str = "cores.txt.lock";
const CORES_FILE: &str = "cores.txt";
const CHUNK: usize = 64 * 1024;

/// Outcome of preparing the lock directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockFiles {
    Created { lock: PathBuf, cores: PathBuf },
    /// The directory could not be prepared; tasks will need the files created
    /// by hand.
    Degraded { reason: String },
}

impl LockFiles {
    pub fn is_degraded(&self) -> bool {
        matches!(self, LockFiles::Degraded { .. })
    }
}

/// Create (or truncate) `cores.txt` and `cores.txt.lock` in `lock_dir`.
///
/// Failure does not prevent generation: it is logged, reported to the
/// operator, and returned as [`LockFiles::Degraded`].
pub fn prepare_lock_files(lock_dir: &Path) -> LockFiles {
    let lock = lock_dir.join(LOCK_FILE);
    let cores = lock_dir.join(CORES_FILE);
    let created = fs::create_dir_all(lock_dir)
        .and_then(|_| truncate(&lock))
        .and_then(|_| truncate(&cores));

    match created {
        Ok(()) => {
            wlog_debug!("Lock files ready in {}", lock_dir.display());
            LockFiles::Created { lock, cores }
        }
        Err(e) => {
            wlog_warn!(
                "Could not prepare lock files in {}: {}",
                lock_dir.display(),
                e
            );
            eprintln!(
                "Could not find folder to create lock files: {}\n\
                 You will need to create them manually: '{}' and '{}'",
                lock_dir.display(),
                LOCK_FILE,
                CORES_FILE
            );
            LockFiles::Degraded {
                reason: e.to_string(),
            }
        }
    }
}

fn truncate(path: &Path) -> std::io::Result<()> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map(|_| ())
}

/// Write `size_kb * 1000` random bytes to `<save_dir>/data/<file_name>`.
pub fn write_payload(save_dir: &Path, file_name: &str, size_kb: u64) -> Result<PathBuf> {
    let data_dir = save_dir.join(DATA_DIR);
    fs::create_dir_all(&data_dir)?;
    let path = data_dir.join(file_name);

    let mut remaining = size_kb.checked_mul(1000).ok_or_else(|| {
        Error::Validation(format!("payload of {} KB is too large", size_kb))
    })?;
    let mut writer = BufWriter::new(File::create(&path)?);
    let mut rng = rand::thread_rng();
    let mut chunk = vec![0u8; CHUNK];
    while remaining > 0 {
        let len = remaining.min(CHUNK as u64) as usize;
        rng.fill_bytes(&mut chunk[..len]);
        writer.write_all(&chunk[..len])?;
        remaining -= len as u64;
    }
    writer.flush()?;

    wlog_debug!("Wrote {} KB payload to {}", size_kb, path.display());
    Ok(path)
}

/// Files produced by [`materialize`].
#[derive(Debug, Clone)]
pub struct Benchmark {
    pub workflow: Workflow,
    pub document: PathBuf,
    /// `None` for commands that declare no files.
    pub payload: Option<PathBuf>,
    pub lock_files: LockFiles,
}

/// Generate a synthetic workflow and lay it out for execution in `save_dir`.
///
/// Parameters are validated before anything touches the filesystem.
pub fn materialize(
    topology: Topology,
    config: &GeneratorConfig,
    meta: &WorkflowMeta,
    save_dir: &Path,
) -> Result<Benchmark> {
    topology.validate(config)?;
    let workflow = topology.generate(config, meta)?;

    let lock_files = prepare_lock_files(&config.resources.lock_dir);

    let document_path = save_dir.join(topology.document_file_name(config.num_tasks));
    document::write(&workflow, &document_path)?;

    let initial_input = workflow
        .tasks()
        .first()
        .and_then(|t| t.inputs().next())
        .map(|f| (f.name.clone(), f.size));
    let payload = match initial_input {
        Some((name, size_kb)) => Some(write_payload(save_dir, &name, size_kb)?),
        None => None,
    };

    wlog!(
        "Materialized {} benchmark with {} tasks in {}",
        topology,
        config.num_tasks,
        save_dir.display()
    );
    Ok(Benchmark {
        workflow,
        document: document_path,
        payload,
        lock_files,
    })
}
