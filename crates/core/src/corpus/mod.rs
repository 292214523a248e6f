//! Line-delimited JSON corpora on disk.
//!
//! Reading is lenient per line: a line that fails to decode is skipped,
//! logged, and counted, and the rest of the file is still read. Failing to
//! open or read a file at all is fatal.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{build_program_lenient, Program, RawFunctionRecord};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse line {line} of {path}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode record for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Records decoded from a JSONL file plus the lines that were skipped.
#[derive(Debug)]
pub struct JsonlRead<T> {
    pub records: Vec<T>,
    pub parse_errors: Vec<CorpusError>,
}

impl<T> JsonlRead<T> {
    pub fn parse_error_count(&self) -> usize {
        self.parse_errors.len()
    }
}

/// Read one JSON value per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<JsonlRead<T>, CorpusError> {
    let file =
        File::open(path).map_err(|source| CorpusError::Open { path: path.to_path_buf(), source })?;
    let mut reader = BufReader::new(file);
    let mut out = JsonlRead { records: Vec::new(), parse_errors: Vec::new() };
    let mut line = Vec::new();
    let mut line_no = 0;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| CorpusError::Io { path: path.to_path_buf(), source })?;
        if read == 0 {
            break;
        }
        line_no += 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        // Decoding from bytes also rejects invalid UTF-8 as a per-line failure.
        match serde_json::from_slice::<T>(&line) {
            Ok(record) => out.records.push(record),
            Err(source) => {
                let err = CorpusError::Parse { path: path.to_path_buf(), line: line_no, source };
                warn!(%err, "skipping corpus line");
                out.parse_errors.push(err);
            }
        }
    }

    if !out.parse_errors.is_empty() {
        info!(
            path = %path.display(),
            records = out.records.len(),
            skipped = out.parse_errors.len(),
            "corpus read with skipped lines"
        );
    }
    Ok(out)
}

/// Read a whole file as one JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CorpusError> {
    let text = fs::read_to_string(path)
        .map_err(|source| CorpusError::Open { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text)
        .map_err(|source| CorpusError::Decode { path: path.to_path_buf(), source })
}

/// Write one JSON value per line, replacing any existing file. Returns the
/// number of records written.
pub fn write_jsonl<'a, T, I>(path: &Path, records: I) -> Result<usize, CorpusError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let io_err = |source| CorpusError::Io { path: path.to_path_buf(), source };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)
            .map_err(|source| CorpusError::Encode { path: path.to_path_buf(), source })?;
        writer.write_all(b"\n").map_err(io_err)?;
        written += 1;
    }
    writer.flush().map_err(io_err)?;
    Ok(written)
}

/// Program name for a per-program records file: its file name.
pub fn program_name_for(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

/// One program read from disk, with its per-record accounting.
#[derive(Debug)]
pub struct LoadedProgram {
    pub program: Program,
    pub malformed_records: usize,
    pub parse_errors: usize,
}

/// Load one program from a JSONL file of raw function records.
pub fn load_program(path: &Path) -> Result<LoadedProgram, CorpusError> {
    let read = read_jsonl::<RawFunctionRecord>(path)?;
    let load = build_program_lenient(&program_name_for(path), read.records);
    Ok(LoadedProgram {
        program: load.program,
        malformed_records: load.skipped.len(),
        parse_errors: read.parse_errors.len(),
    })
}

/// Everything loaded from a set of program files.
#[derive(Debug, Default)]
pub struct ProgramSet {
    pub programs: Vec<Program>,
    pub missing_files: usize,
    pub malformed_records: usize,
    pub parse_errors: usize,
}

impl ProgramSet {
    pub fn function_count(&self) -> usize {
        self.programs.iter().map(Program::function_count).sum()
    }
}

/// Resolve program files from `input`: every `*.jsonl` in a directory (sorted),
/// a single `.jsonl` file, or a list file with one path per line (relative
/// paths resolved against the list's directory).
pub fn program_paths(input: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    if input.is_dir() {
        let entries = fs::read_dir(input)
            .map_err(|source| CorpusError::Open { path: input.to_path_buf(), source })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|source| CorpusError::Io { path: input.to_path_buf(), source })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
                paths.push(path);
            }
        }
        paths.sort();
        return Ok(paths);
    }

    if input.extension().is_some_and(|ext| ext == "jsonl") {
        return Ok(vec![input.to_path_buf()]);
    }

    let listing = fs::read_to_string(input)
        .map_err(|source| CorpusError::Open { path: input.to_path_buf(), source })?;
    let base = input.parent().unwrap_or_else(|| Path::new("."));
    Ok(listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            let p = Path::new(l);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        })
        .collect())
}

/// Load every program in `paths`. Missing files are logged and skipped.
pub fn load_programs(paths: &[PathBuf]) -> Result<ProgramSet, CorpusError> {
    let mut set = ProgramSet::default();
    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "program file not found; skipping");
            set.missing_files += 1;
            continue;
        }
        let loaded = load_program(path)?;
        set.malformed_records += loaded.malformed_records;
        set.parse_errors += loaded.parse_errors;
        set.programs.push(loaded.program);
    }
    info!(
        programs = set.programs.len(),
        functions = set.function_count(),
        missing_files = set.missing_files,
        malformed = set.malformed_records,
        "programs loaded"
    );
    Ok(set)
}
