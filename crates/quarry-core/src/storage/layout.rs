//! Deterministic on-disk layout for result and average files.
//!
//! `<root>/<system>_<benchmark>_results/<dataset>/<scale-unit>/<cached|no_cache>/<system>_results_run_<N>.csv`

use crate::model::{BenchmarkType, CacheMode, System};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const AVERAGE_FILE_NAME: &str = "avg_results.csv";

/// Identity of a result set, everything but the run number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultKey {
    pub system: System,
    pub benchmark: BenchmarkType,
    pub dataset: String,
    pub scale_unit: String,
    pub cache: CacheMode,
}

impl ResultKey {
    pub fn dir(&self, root: &Path) -> PathBuf {
        let mut p = root.join(format!("{}_{}_results", self.system, self.benchmark));
        // dataset identities like `tpch/01` nest one level per segment
        for seg in self.dataset.split('/').filter(|s| !s.is_empty()) {
            p.push(seg);
        }
        p.push(&self.scale_unit);
        p.push(self.cache.dir_name());
        p
    }

    pub fn run_file(&self, root: &Path, run: u32) -> PathBuf {
        self.dir(root).join(run_file_name(self.system, run))
    }

    pub fn average_file(&self, root: &Path) -> PathBuf {
        self.dir(root).join(AVERAGE_FILE_NAME)
    }

    /// Run numbers of the result files currently on disk for this key, ascending.
    pub fn existing_runs(&self, root: &Path) -> std::io::Result<Vec<u32>> {
        let files = scan_run_files(&self.dir(root))?;
        let mut runs: Vec<u32> = files
            .into_iter()
            .filter(|f| f.system == self.system)
            .map(|f| f.run)
            .collect();
        runs.sort_unstable();
        Ok(runs)
    }

    /// One past the highest existing run number, so result files are never overwritten.
    pub fn next_run_number(&self, root: &Path) -> std::io::Result<u32> {
        Ok(self.existing_runs(root)?.last().map_or(1, |n| n + 1))
    }
}

pub fn run_file_name(system: System, run: u32) -> String {
    format!("{}_results_run_{}.csv", system, run)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFile {
    pub system: System,
    pub run: u32,
    pub path: PathBuf,
}

fn run_file_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(snowflake|embucket)_results_run_(\d+)\.csv$").expect("static regex")
    })
}

/// Parses a run file name into its system and run number.
pub fn parse_run_file_name(name: &str) -> Option<(System, u32)> {
    let caps = run_file_pattern().captures(name)?;
    let system = caps.get(1)?.as_str().parse().ok()?;
    let run = caps.get(2)?.as_str().parse().ok()?;
    Some((system, run))
}

/// Lists run files in `dir`, sorted by path. A missing directory yields nothing.
pub fn scan_run_files(dir: &Path) -> std::io::Result<Vec<RunFile>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some((system, run)) = name.to_str().and_then(parse_run_file_name) else {
            continue;
        };
        files.push(RunFile {
            system,
            run,
            path: entry.path(),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
