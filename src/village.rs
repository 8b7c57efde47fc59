use crate::geom::{Aabb, BlockPos, Rotation};
use crate::mask::VolumeMask;
use crate::receipt::PlacementReceipt;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A placed building. Immutable after construction; the full commit
/// record lives in the matching receipt, referenced by bounds equality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub building_id: Uuid,
    pub village_id: Uuid,
    pub structure_id: String,
    pub origin: BlockPos,
    pub effective_width: i32,
    pub effective_depth: i32,
    pub rotation: Rotation,
    pub bounds: Aabb,
}

impl Building {
    pub fn receipt<'a>(&self, receipts: &'a [PlacementReceipt]) -> Option<&'a PlacementReceipt> {
        receipts.iter().find(|r| r.bounds == self.bounds)
    }
}

/// Ground-plane envelope of a village. Starts as a single point at the
/// origin and only ever grows to cover each building footprint.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VillageBorder {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl VillageBorder {
    pub fn point(x: i32, z: i32) -> VillageBorder {
        VillageBorder {
            min_x: x,
            max_x: x,
            min_z: z,
            max_z: z,
        }
    }

    pub fn envelop(&mut self, bounds: &Aabb) {
        self.min_x = self.min_x.min(bounds.min.x);
        self.max_x = self.max_x.max(bounds.max.x);
        self.min_z = self.min_z.min(bounds.min.z);
        self.max_z = self.max_z.max(bounds.max.z);
    }

    /// Manhattan distance between border rectangles; zero when they touch
    /// or overlap on an axis.
    pub fn manhattan_distance_to(&self, other: &VillageBorder) -> i32 {
        let dx = (self.min_x - other.max_x).max(other.min_x - self.max_x).max(0);
        let dz = (self.min_z - other.max_z).max(other.min_z - self.max_z).max(0);
        dx + dz
    }
}

/// One routed path between two entrances, with the traversal-ordered
/// block list and its determinism hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub from: BlockPos,
    pub to: BlockPos,
    pub blocks: Vec<BlockPos>,
    pub hash: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathNetwork {
    pub segments: Vec<PathSegment>,
}

impl PathNetwork {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_blocks(&self) -> usize {
        self.segments.iter().map(|s| s.blocks.len()).sum()
    }
}

/// A generated village: buildings, ground-truth receipts, occupancy
/// masks, border, and the routed path network. Owned by the store;
/// accessors hand out clones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub village_id: Uuid,
    pub culture_id: String,
    pub world_name: String,
    pub origin: BlockPos,
    pub seed: u64,
    pub created_at: u64,
    pub buildings: Vec<Building>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_building_id: Option<Uuid>,
    pub border: VillageBorder,
    pub placement_receipts: Vec<PlacementReceipt>,
    pub volume_masks: Vec<VolumeMask>,
    #[serde(default, skip_serializing_if = "PathNetwork::is_empty")]
    pub path_network: PathNetwork,
    /// Fraction of attempted paths that were routed (1.0 when no paths
    /// were needed).
    #[serde(default = "full_connectivity")]
    pub connectivity: f32,
    /// Set when a paste failed after terraforming: the world holds an
    /// orphaned site that needs auditing.
    #[serde(default)]
    pub partially_committed: bool,
    /// Unrecognized persisted fields, preserved for round-trip.
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn full_connectivity() -> f32 {
    1.0
}

impl Village {
    pub fn new(
        village_id: Uuid,
        culture_id: impl Into<String>,
        world_name: impl Into<String>,
        origin: BlockPos,
        seed: u64,
    ) -> Village {
        Village {
            village_id,
            culture_id: culture_id.into(),
            world_name: world_name.into(),
            origin,
            seed,
            created_at: epoch_seconds(),
            buildings: Vec::new(),
            main_building_id: None,
            border: VillageBorder::point(origin.x, origin.z),
            placement_receipts: Vec::new(),
            volume_masks: Vec::new(),
            path_network: PathNetwork::default(),
            connectivity: 1.0,
            partially_committed: false,
            extra: serde_json::Map::new(),
        }
    }

    pub fn main_building(&self) -> Option<&Building> {
        let id = self.main_building_id?;
        self.buildings.iter().find(|b| b.building_id == id)
    }

    /// One-line status report for the command surface.
    pub fn status_line(&self) -> String {
        format!(
            "village {} culture={} world={} origin=({},{},{}) buildings={} paths={} connectivity={:.2}{}",
            self.village_id,
            self.culture_id,
            self.world_name,
            self.origin.x,
            self.origin.y,
            self.origin.z,
            self.buildings.len(),
            self.path_network.segments.len(),
            self.connectivity,
            if self.partially_committed { " PARTIAL" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_grows_monotonically() {
        let mut border = VillageBorder::point(0, 0);
        border.envelop(&Aabb::new(BlockPos::new(-5, 60, 2), BlockPos::new(3, 70, 9)));
        assert_eq!(border.min_x, -5);
        assert_eq!(border.max_x, 3);
        assert_eq!(border.max_z, 9);
        border.envelop(&Aabb::new(BlockPos::new(0, 60, 0), BlockPos::new(1, 70, 1)));
        assert_eq!(border.min_x, -5);
    }

    #[test]
    fn border_distance_is_zero_when_overlapping() {
        let a = VillageBorder {
            min_x: 0,
            max_x: 10,
            min_z: 0,
            max_z: 10,
        };
        let b = VillageBorder {
            min_x: 5,
            max_x: 15,
            min_z: 5,
            max_z: 15,
        };
        assert_eq!(a.manhattan_distance_to(&b), 0);
    }

    #[test]
    fn border_distance_sums_axis_gaps() {
        let a = VillageBorder {
            min_x: 0,
            max_x: 10,
            min_z: 0,
            max_z: 10,
        };
        let b = VillageBorder {
            min_x: 25,
            max_x: 30,
            min_z: 40,
            max_z: 50,
        };
        assert_eq!(a.manhattan_distance_to(&b), 15 + 30);
        assert_eq!(b.manhattan_distance_to(&a), 45);
    }

    #[test]
    fn buildings_find_their_receipt_by_bounds() {
        use crate::receipt::tests_support::sample_receipt;
        let receipt = sample_receipt();
        let building = Building {
            building_id: Uuid::from_u128(9),
            village_id: receipt.village_id,
            structure_id: receipt.structure_id.clone(),
            origin: receipt.origin,
            effective_width: receipt.effective_width,
            effective_depth: receipt.effective_depth,
            rotation: receipt.rotation,
            bounds: receipt.bounds,
        };
        let receipts = vec![receipt];
        assert!(building.receipt(&receipts).is_some());
    }
}
