use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use crate::types::{CubeId, NetworkId, PointId, SerialNumber};

/// A single observation of a ground feature within one cube.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControlMeasure {
    /// Identifier of the cube this measure was taken from.
    pub cube_id: CubeId,
    /// Sample (column) coordinate of the measure within the cube.
    pub sample: f64,
    /// Line (row) coordinate of the measure within the cube.
    pub line: f64,
}

/// A point tying together measures of the same ground feature across cubes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Stable point identifier.
    pub id: PointId,
    /// Measures of this point, at most one per observing cube.
    pub measures: Vec<ControlMeasure>,
}

/// In-memory projection of a control network.
///
/// This is the input from which a cube list is derived; the service never
/// mutates it and keeps no reference to it after projection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ControlNetwork {
    /// Network identifier.
    pub net_id: NetworkId,
    /// Points in the network.
    pub points: Vec<ControlPoint>,
}

impl ControlNetwork {
    /// Collect the unique cube ids referenced by this network, in first-seen
    /// order across points and measures.
    pub fn cube_ids(&self) -> Vec<CubeId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for point in &self.points {
            for measure in &point.measures {
                if seen.insert(measure.cube_id.as_str()) {
                    ids.push(measure.cube_id.clone());
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(cube_id: &str) -> ControlMeasure {
        ControlMeasure {
            cube_id: cube_id.to_string(),
            sample: 10.0,
            line: 20.0,
        }
    }

    #[test]
    fn cube_ids_dedupe_in_first_seen_order() {
        let net = ControlNetwork {
            net_id: "net".to_string(),
            points: vec![
                ControlPoint {
                    id: "p1".to_string(),
                    measures: vec![measure("/a/1.cub"), measure("/a/2.cub")],
                },
                ControlPoint {
                    id: "p2".to_string(),
                    measures: vec![measure("/a/2.cub"), measure("/a/3.cub")],
                },
            ],
        };
        assert_eq!(net.cube_ids(), vec!["/a/1.cub", "/a/2.cub", "/a/3.cub"]);
    }

    #[test]
    fn empty_network_projects_no_ids() {
        let net = ControlNetwork::default();
        assert!(net.cube_ids().is_empty());
    }
}
