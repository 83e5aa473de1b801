#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Background composition jobs and their handles.
pub mod compose;
/// Composer configuration types.
pub mod config;
/// Centralized constants used across composition, labels, and progress.
pub mod constants;
/// Control-network projection types.
pub mod data;
/// The owning facade and display-mode state.
pub mod display;
/// Bidirectional cube-id/serial-number map.
pub mod keymap;
/// Progress events and the polling bridge.
pub mod progress;
/// Serial resolution interfaces and built-in resolvers.
pub mod resolver;
/// Shared type aliases.
pub mod types;
/// Path formatting and cube-list file helpers.
pub mod utils;

mod errors;

pub use compose::{ComposeJob, CompositionStats, JobHandle, JobState};
pub use config::ComposerConfig;
pub use data::{ControlMeasure, ControlNetwork, ControlPoint};
pub use display::{CoordinateDisplay, DisplayProperties};
pub use errors::ComposeError;
pub use keymap::KeyMap;
pub use progress::{ProgressBridge, ProgressEvent};
pub use resolver::{InMemoryResolver, LabelResolver, SerialResolver};
pub use types::{CubeId, DisplayName, NetworkId, PointId, SerialNumber};
