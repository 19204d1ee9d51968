//! JSON-lines files for audit entries
//!
//! Used for the optional append mirror and for `vigil audit-export`. One
//! serialized value per line, newline-terminated.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends serialized values to a file, one per line
#[derive(Debug, Clone)]
pub struct JsonLinesWriter {
    path: PathBuf,
}

impl JsonLinesWriter {
    /// Writer that appends to `path`, creating parent directories
    pub fn append_to(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory: {}", parent.display())
            })?;
        }
        Ok(Self { path })
    }

    /// Writer for a fresh file; existing content at `path` is discarded
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let writer = Self::append_to(path)?;
        File::create(&writer.path)
            .with_context(|| format!("Failed to create file: {}", writer.path.display()))?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one value
    pub fn append<T: Serialize>(&self, value: &T) -> Result<()> {
        self.append_all(std::iter::once(value)).map(|_| ())
    }

    /// Append every value, returning how many were written
    pub fn append_all<'a, T, I>(&self, values: I) -> Result<usize>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        let mut written = 0;
        for value in values {
            let line = serde_json::to_string(value).context("Failed to serialize entry")?;
            writeln!(writer, "{line}").context("Failed to write entry")?;
            written += 1;
        }
        writer.flush().context("Failed to flush entries")?;
        Ok(written)
    }
}

/// Read every line of a JSON-lines file
pub fn read_json_lines<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    BufReader::new(file)
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |line| !line.trim().is_empty()))
        .map(|(number, line)| {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&line)
                .with_context(|| format!("Invalid entry on line {} of {}", number + 1, path.display()))
        })
        .collect()
}
