//! On-disk layout of intermediate and output files.
//!
//! Every write goes to a fresh temporary file in the target directory and is
//! renamed onto its canonical name once complete, so readers only ever see
//! whole files and concurrent attempts of the same task cannot interleave.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::error::{MrError, Result};

const INTERMEDIATE_PREFIX: &str = "mr-int";
const OUTPUT_PREFIX: &str = "mr-out";
const TEMP_PREFIX: &str = ".mr-tmp";

pub fn intermediate_path(dir: &Path, map_index: usize, bucket: usize) -> PathBuf {
    dir.join(format!("{}-{}-{}", INTERMEDIATE_PREFIX, map_index, bucket))
}

pub fn output_path(dir: &Path, reduce_index: usize) -> PathBuf {
    dir.join(format!("{}-{}", OUTPUT_PREFIX, reduce_index))
}

/// Intermediate files written for `bucket` by any map task.
pub fn find_intermediate(dir: &Path, bucket: usize) -> Result<Vec<PathBuf>> {
    let dir = dir
        .to_str()
        .ok_or_else(|| MrError::InvalidConfig(format!("non utf-8 work dir {:?}", dir)))?;
    let pattern = Path::new(&glob::Pattern::escape(dir))
        .join(format!("{}-*-{}", INTERMEDIATE_PREFIX, bucket));
    let pattern = pattern.to_string_lossy();

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        files.push(entry?);
    }
    files.sort();
    Ok(files)
}

/// Collects everything written to one temporary file before it is renamed into place.
pub struct AtomicWriter {
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl AtomicWriter {
    pub fn create(target: PathBuf) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let file = Builder::new().prefix(TEMP_PREFIX).tempfile_in(&dir)?;
        Ok(AtomicWriter {
            writer: BufWriter::new(file),
            target,
        })
    }

    pub fn write_record(&mut self, key: &str, value: &str) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &(key, value))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_line(&mut self, key: &str, value: &str) -> Result<()> {
        writeln!(self.writer, "{} {}", key, value)?;
        Ok(())
    }

    /// Flushes and renames onto the target path, replacing any previous file.
    pub fn commit(self) -> Result<PathBuf> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.as_file().sync_all()?;
        file.persist(&self.target).map_err(|e| e.error)?;
        Ok(self.target)
    }
}

pub fn read_intermediate(path: &Path) -> Result<Vec<(String, String)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
