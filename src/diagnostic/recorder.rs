use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
    sync::{Mutex, PoisonError},
};

use super::{DiagnosticSink, Inspection};
use crate::{Error, Result};

/// A sink that appends inspections to a file as JSON lines.
///
/// Each inspection is written as one [`InspectionReport`](super::InspectionReport)
/// object followed by a newline, and the call proceeds.
pub struct Recorder {
    writer: Mutex<BufWriter<File>>,
}

impl Recorder {
    /// Create a recorder appending to `path`, creating the file if needed.
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl DiagnosticSink for Recorder {
    fn inspect(&self, inspection: &Inspection<'_>) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, &inspection.report())
            .map_err(|e| Error::external(e.to_string()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
