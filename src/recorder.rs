use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::types::Reading;

pub const HEADER: &str = "#Time [s]\tDCV [V]\n";
const MAX_SUFFIX: u32 = 10_000;

#[derive(Debug, Error)]
pub enum FileSinkError {
    #[error("cannot create output file {path}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("cannot append to output file {path}: {source}")]
    Append { path: PathBuf, source: io::Error },
    #[error("no free file name next to {0}")]
    NoFreeName(PathBuf),
}

/// Append-only text file. The file is opened and closed around every line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSink {
    path: PathBuf,
}

impl OutputSink {
    /// Creates the output file and writes the header. An existing file is never
    /// touched: `out.txt` becomes `out.txt_1`, then `out.txt_2`, and so on.
    pub fn create(requested: &Path) -> Result<Self, FileSinkError> {
        let (path, file) = create_fresh(requested)?;
        if path != requested {
            warn!(
                "File {} already exists! Writing to {} instead",
                requested.display(),
                path.display()
            );
        }
        write_header(file, &path)?;
        info!("Writing output file {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, reading: &Reading) -> Result<(), FileSinkError> {
        let line = format_line(reading);
        OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| FileSinkError::Append {
                path: self.path.clone(),
                source,
            })
    }
}

/// `"%f\t%f\n"`
pub fn format_line(reading: &Reading) -> String {
    format!("{:.6}\t{:.6}\n", reading.elapsed, reading.value)
}

fn create_fresh(requested: &Path) -> Result<(PathBuf, File), FileSinkError> {
    let mut candidate = requested.to_path_buf();
    for n in 1..=MAX_SUFFIX {
        match OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = with_suffix(requested, n);
            }
            Err(source) => {
                return Err(FileSinkError::Create {
                    path: candidate,
                    source,
                })
            }
        }
    }
    Err(FileSinkError::NoFreeName(requested.to_path_buf()))
}

/// A file whose header could not be written is removed again.
fn write_header<W: Write>(mut file: W, path: &Path) -> Result<(), FileSinkError> {
    let written = file.write_all(HEADER.as_bytes()).and_then(|_| file.flush());
    drop(file);
    written.map_err(|source| {
        fs::remove_file(path).ok();
        FileSinkError::Create {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn with_suffix(path: &Path, n: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!("_{n}"));
    PathBuf::from(name)
}
