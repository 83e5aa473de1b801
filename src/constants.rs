/// Constants used by composition runtime behavior and progress polling.
pub mod compose {
    use std::time::Duration;

    /// Default interval between progress bridge samples of the job counters.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
}

/// Constants used by cube label parsing and serial composition.
pub mod label {
    /// Max bytes scanned for a cube's leading label block.
    pub const DEFAULT_LABEL_SCAN_BYTES: usize = 64 * 1024;
    /// Label keyword holding the spacecraft name.
    pub const KEY_SPACECRAFT: &str = "SpacecraftName";
    /// Label keyword holding the instrument id.
    pub const KEY_INSTRUMENT: &str = "InstrumentId";
    /// Label keyword holding the observation start time.
    pub const KEY_START_TIME: &str = "StartTime";
    /// Separator joining label fields into a serial number.
    pub const SERIAL_FIELD_DELIMITER: &str = "/";
    /// Line that terminates a cube label block.
    pub const LABEL_END_MARKER: &str = "End";
    /// Comment prefix recognized in cube-list files.
    pub const LIST_COMMENT_PREFIX: &str = "#";
}
