//! Serial resolution interfaces and built-in resolvers.
//!
//! Ownership model:
//! - `SerialResolver` is the job-facing interface: one cube id in, one
//!   serial number out, fallible per item.
//! - `LabelResolver` derives serials from the cube file's label block.
//! - `InMemoryResolver` serves a fixed table, for tests and pre-composed
//!   inputs.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::constants::label::{
    DEFAULT_LABEL_SCAN_BYTES, KEY_INSTRUMENT, KEY_SPACECRAFT, KEY_START_TIME,
    LABEL_END_MARKER, SERIAL_FIELD_DELIMITER,
};
use crate::errors::ComposeError;
use crate::types::{CubeId, SerialNumber};

/// Job-facing serial derivation interface.
///
/// Implementations are called from the composition worker thread; for a
/// fixed cube state the derived serial should be deterministic. A failed
/// resolution only skips that cube, it never aborts the batch.
pub trait SerialResolver: Send + Sync {
    /// Derive the serial number for `cube_id`.
    fn resolve(&self, cube_id: &str) -> Result<SerialNumber, ComposeError>;
}

/// Resolver that derives serials from the leading label block of the cube
/// file.
///
/// The label is the run of `Keyword = Value` lines at the start of the file,
/// terminated by an `End` line and scanned up to a bounded number of bytes.
/// The serial is composed as `SpacecraftName/InstrumentId/StartTime`.
pub struct LabelResolver {
    scan_bytes: usize,
}

impl LabelResolver {
    /// Create a resolver with the default label scan limit.
    pub fn new() -> Self {
        Self {
            scan_bytes: DEFAULT_LABEL_SCAN_BYTES,
        }
    }

    /// Override how many bytes of the file are scanned for the label block.
    pub fn with_scan_bytes(mut self, scan_bytes: usize) -> Self {
        self.scan_bytes = scan_bytes.max(1);
        self
    }

    fn read_label(&self, path: &Path) -> Result<HashMap<String, String>, ComposeError> {
        let mut head = Vec::with_capacity(self.scan_bytes.min(8 * 1024));
        File::open(path)?
            .take(self.scan_bytes as u64)
            .read_to_end(&mut head)?;
        let text = String::from_utf8_lossy(&head);

        let mut keywords = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line == LABEL_END_MARKER {
                break;
            }
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim();
                if !key.is_empty() && !value.is_empty() {
                    keywords.insert(key.to_string(), value.to_string());
                }
            }
        }
        Ok(keywords)
    }
}

impl Default for LabelResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialResolver for LabelResolver {
    fn resolve(&self, cube_id: &str) -> Result<SerialNumber, ComposeError> {
        let keywords = self.read_label(Path::new(cube_id))?;
        if keywords.is_empty() {
            return Err(ComposeError::UnreadableLabel {
                cube_id: cube_id.to_string(),
                reason: "no label keywords found".to_string(),
            });
        }
        let mut fields = Vec::with_capacity(3);
        for keyword in [KEY_SPACECRAFT, KEY_INSTRUMENT, KEY_START_TIME] {
            match keywords.get(keyword) {
                Some(value) => fields.push(value.as_str()),
                None => {
                    return Err(ComposeError::MissingKeyword {
                        cube_id: cube_id.to_string(),
                        keyword: keyword.to_string(),
                    });
                }
            }
        }
        Ok(fields.join(SERIAL_FIELD_DELIMITER))
    }
}

/// Fixed-table resolver for tests, demos, and pre-composed inputs.
///
/// Ids absent from the table fail with `ComposeError::UnknownCube`, which is
/// also the simplest way to exercise skip-on-failure composition paths.
pub struct InMemoryResolver {
    serials: HashMap<CubeId, SerialNumber>,
}

impl InMemoryResolver {
    /// Create a resolver serving the given pairings.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CubeId, SerialNumber)>,
    {
        Self {
            serials: entries.into_iter().collect(),
        }
    }
}

impl SerialResolver for InMemoryResolver {
    fn resolve(&self, cube_id: &str) -> Result<SerialNumber, ComposeError> {
        self.serials
            .get(cube_id)
            .cloned()
            .ok_or_else(|| ComposeError::UnknownCube {
                cube_id: cube_id.to_string(),
            })
    }
}
