use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use tracing::debug;

use crate::compose::{ComposeJob, CompositionStats, JobHandle, JobState};
use crate::config::ComposerConfig;
use crate::data::ControlNetwork;
use crate::errors::ComposeError;
use crate::keymap::KeyMap;
use crate::progress::{ProgressBridge, ProgressEvent};
use crate::resolver::{LabelResolver, SerialResolver};
use crate::types::{CubeId, DisplayName, SerialNumber};
use crate::utils::read_cube_list;

const COORD_LAT_LON_RADIUS: u8 = 0;
const COORD_XYZ: u8 = 1;

/// How point coordinates should be displayed by observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateDisplay {
    /// Latitude, longitude, and radius.
    LatLonRadius,
    /// Body-fixed X/Y/Z.
    Xyz,
}

/// The owning facade: one per process.
///
/// Holds the cube-id/serial-number map and the display-mode flags, runs at
/// most one composition job at a time, and fans progress events out to
/// subscribers. Deliberately not `Clone`: the one instance is shared by
/// reference (typically an `Arc`), and every method takes `&self`.
pub struct DisplayProperties {
    keymap: KeyMap,
    resolver: Arc<dyn SerialResolver>,
    config: ComposerConfig,
    show_full_paths: AtomicBool,
    prefer_file_names: AtomicBool,
    coordinate_display: AtomicU8,
    current: Mutex<Option<CurrentComposition>>,
    subscribers: Subscribers,
}

/// The in-flight job/bridge pair owned by the facade.
struct CurrentComposition {
    handle: JobHandle,
    bridge: ProgressBridge,
}

/// Fan-out sender distributing events to all live subscribers.
#[derive(Clone, Default)]
struct Subscribers {
    senders: Arc<Mutex<Vec<mpsc::Sender<ProgressEvent>>>>,
}

impl Subscribers {
    fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        let (sender, receiver) = mpsc::channel();
        self.senders
            .lock()
            .expect("subscriber list poisoned")
            .push(sender);
        receiver
    }

    fn emit(&self, event: ProgressEvent) {
        let mut senders = self.senders.lock().expect("subscriber list poisoned");
        senders.retain(|sender| sender.send(event).is_ok());
    }
}

impl DisplayProperties {
    /// Create a service using the label-based resolver and default config.
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(LabelResolver::new()))
    }

    /// Create a service with a custom resolver and default config.
    pub fn with_resolver(resolver: Arc<dyn SerialResolver>) -> Self {
        Self::with_config(resolver, ComposerConfig::default())
    }

    /// Create a service with an explicit resolver and configuration.
    pub fn with_config(resolver: Arc<dyn SerialResolver>, config: ComposerConfig) -> Self {
        Self {
            keymap: KeyMap::new(),
            resolver,
            config,
            show_full_paths: AtomicBool::new(false),
            prefer_file_names: AtomicBool::new(true),
            coordinate_display: AtomicU8::new(COORD_LAT_LON_RADIUS),
            current: Mutex::new(None),
            subscribers: Subscribers::default(),
        }
    }

    /// Start composing serial numbers for `ids` on a background worker.
    ///
    /// Any in-flight job is flagged cancelled and its bridge discarded; the
    /// call never waits for the superseded worker to actually stop. Rapid
    /// successive calls always converge on the last call's result: a
    /// cancelled job can never publish after its successor.
    pub fn set_cube_list(&self, ids: Vec<CubeId>) {
        let mut current = self.current.lock().expect("composition slot poisoned");
        let superseded = if let Some(previous) = current.take() {
            let CurrentComposition { handle, mut bridge } = previous;
            let was_running = handle.state() == JobState::Running;
            handle.cancel();
            bridge.stop();
            was_running
        } else {
            false
        };
        debug!(
            cube_count = ids.len(),
            superseded, "starting serial number composition"
        );

        let handle = ComposeJob::spawn(ids, Arc::clone(&self.resolver), self.keymap.clone());
        let subscribers = self.subscribers.clone();
        let bridge = ProgressBridge::spawn(&handle, self.config.poll_interval, move |event| {
            subscribers.emit(event)
        });
        *current = Some(CurrentComposition { handle, bridge });
    }

    /// Read a cube-list file (one identifier per line, `#` comments and
    /// blank lines skipped) and start composing its identifiers.
    pub fn set_cube_list_from_file(&self, path: impl AsRef<Path>) -> Result<(), ComposeError> {
        let ids = read_cube_list(path)?;
        self.set_cube_list(ids);
        Ok(())
    }

    /// Look up the serial number composed for `cube_id`.
    pub fn get_serial_number(&self, cube_id: &str) -> Option<SerialNumber> {
        self.keymap.forward(cube_id)
    }

    /// Resolve `serial` back to a cube name formatted for display.
    ///
    /// An unmapped serial is returned verbatim, so observers always have
    /// something to show.
    pub fn get_image_name(&self, serial: &str, force_full_paths: bool) -> DisplayName {
        match self.keymap.reverse(serial) {
            Some(cube_id) => self.format_name(&cube_id, force_full_paths),
            None => serial.to_string(),
        }
    }

    /// Format `cube_id` for display, independent of the map.
    pub fn get_file_name(&self, cube_id: &str, force_full_paths: bool) -> DisplayName {
        self.format_name(cube_id, force_full_paths)
    }

    /// Project the unique cube ids out of a control network, in first-seen
    /// order. Purely a projection; feed the result into `set_cube_list`.
    pub fn get_cube_list(&self, network: &ControlNetwork) -> Vec<CubeId> {
        network.cube_ids()
    }

    /// Returns `true` while a composition job is running.
    pub fn currently_composing(&self) -> bool {
        let current = self.current.lock().expect("composition slot poisoned");
        current
            .as_ref()
            .is_some_and(|composition| composition.handle.state() == JobState::Running)
    }

    /// Telemetry of the current job once it reaches a terminal state;
    /// `None` while it is still running or before any job ran.
    pub fn composition_stats(&self) -> Option<CompositionStats> {
        let current = self.current.lock().expect("composition slot poisoned");
        current
            .as_ref()
            .and_then(|composition| composition.handle.stats())
    }

    /// Register an observer; every progress event from now on is delivered
    /// to the returned receiver. Dropped receivers are pruned on emit.
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        self.subscribers.subscribe()
    }

    /// Direct read access to the underlying map.
    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    /// Display full paths rather than base names.
    pub fn set_shows_full_paths(&self, show_full_paths: bool) {
        self.show_full_paths
            .store(show_full_paths, Ordering::Relaxed);
    }

    /// Whether full paths are currently displayed.
    pub fn shows_full_paths(&self) -> bool {
        self.show_full_paths.load(Ordering::Relaxed)
    }

    /// Prefer file names over serial numbers in observer-facing labels.
    pub fn set_file_name_usage(&self, prefer_file_names: bool) {
        self.prefer_file_names
            .store(prefer_file_names, Ordering::Relaxed);
    }

    /// Whether file names are preferred over serial numbers.
    pub fn prefers_file_names(&self) -> bool {
        self.prefer_file_names.load(Ordering::Relaxed)
    }

    /// Set how point coordinates should be displayed.
    pub fn set_coordinate_display(&self, display: CoordinateDisplay) {
        let encoded = match display {
            CoordinateDisplay::LatLonRadius => COORD_LAT_LON_RADIUS,
            CoordinateDisplay::Xyz => COORD_XYZ,
        };
        self.coordinate_display.store(encoded, Ordering::Relaxed);
    }

    /// Current coordinate display mode.
    pub fn coordinate_display(&self) -> CoordinateDisplay {
        match self.coordinate_display.load(Ordering::Relaxed) {
            COORD_XYZ => CoordinateDisplay::Xyz,
            _ => CoordinateDisplay::LatLonRadius,
        }
    }

    fn format_name(&self, cube_id: &str, force_full_paths: bool) -> DisplayName {
        crate::utils::display_name(cube_id, self.shows_full_paths() || force_full_paths)
    }
}

impl Default for DisplayProperties {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::InMemoryResolver;

    fn service() -> DisplayProperties {
        DisplayProperties::with_resolver(Arc::new(InMemoryResolver::new([])))
    }

    #[test]
    fn display_mode_flags_default_and_toggle() {
        let service = service();
        assert!(!service.shows_full_paths());
        assert!(service.prefers_file_names());
        assert_eq!(service.coordinate_display(), CoordinateDisplay::LatLonRadius);

        service.set_shows_full_paths(true);
        service.set_file_name_usage(false);
        service.set_coordinate_display(CoordinateDisplay::Xyz);
        assert!(service.shows_full_paths());
        assert!(!service.prefers_file_names());
        assert_eq!(service.coordinate_display(), CoordinateDisplay::Xyz);
    }

    #[test]
    fn file_name_formatting_honors_mode_and_force() {
        let service = service();
        assert_eq!(service.get_file_name("/a/2.img", false), "2.img");
        assert_eq!(service.get_file_name("/a/2.img", true), "/a/2.img");

        service.set_shows_full_paths(true);
        assert_eq!(service.get_file_name("/a/2.img", false), "/a/2.img");
    }

    #[test]
    fn unmapped_serial_is_returned_verbatim() {
        let service = service();
        assert_eq!(service.get_image_name("SN404", false), "SN404");
    }

    #[test]
    fn no_job_means_not_composing_and_no_stats() {
        let service = service();
        assert!(!service.currently_composing());
        assert!(service.composition_stats().is_none());
    }
}
