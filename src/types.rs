/// Stable cube identifier used as the forward key of the name map.
/// Example: `/work/lub/lunar_0001.cub`
pub type CubeId = String;
/// Derived serial identifier for a cube, one per `CubeId`.
/// Example: `LUNAR_ORBITER/HIGH_RESOLUTION_CAMERA/1966-08-23T16:04:32`
pub type SerialNumber = String;
/// Observer-facing formatted cube name.
/// Examples: `lunar_0001.cub`, `/work/lub/lunar_0001.cub`
pub type DisplayName = String;
/// Identifier for a control point within a network.
/// Example: `crater_rim_014`
pub type PointId = String;
/// Identifier for a control network.
/// Example: `lub_nearside_2026`
pub type NetworkId = String;
