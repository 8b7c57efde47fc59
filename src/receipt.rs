use crate::block::BlockMaterial;
use crate::geom::{Aabb, BlockPos, Rotation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Foundation corner identifiers, clockwise from the min-x/min-z corner.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Corner {
    NW,
    NE,
    SE,
    SW,
}

/// One sampled foundation corner at the structure's base level.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CornerSample {
    pub corner: Corner,
    pub pos: BlockPos,
    pub material: BlockMaterial,
}

/// Ground-truth record of a committed structure placement.
///
/// Built exactly once per successful commit and immutable afterwards;
/// masks and buildings are derived from it by bounds copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementReceipt {
    pub structure_id: String,
    pub village_id: Uuid,
    pub bounds: Aabb,
    pub origin: BlockPos,
    pub rotation: Rotation,
    /// Ground-plane dims after rotation.
    pub effective_width: i32,
    pub effective_depth: i32,
    pub height: i32,
    /// NW, NE, SE, SW at the base level.
    pub foundation_corners: [CornerSample; 4],
    pub entrance: BlockPos,
    pub timestamp: u64,
}

impl PlacementReceipt {
    /// Structural invariants: inclusive bounds, positive dims, and corner
    /// samples exactly at the four base-level bound corners.
    pub fn is_well_formed(&self) -> bool {
        let b = &self.bounds;
        let ordered = b.max.x >= b.min.x && b.max.y >= b.min.y && b.max.z >= b.min.z;
        let dims = self.effective_width > 0 && self.effective_depth > 0 && self.height > 0;
        let expected = [
            (Corner::NW, b.min.x, b.min.z),
            (Corner::NE, b.max.x, b.min.z),
            (Corner::SE, b.max.x, b.max.z),
            (Corner::SW, b.min.x, b.max.z),
        ];
        let corners = self
            .foundation_corners
            .iter()
            .zip(expected)
            .all(|(sample, (corner, x, z))| {
                sample.corner == corner
                    && sample.pos == BlockPos::new(x, b.min.y, z)
            });
        ordered && dims && corners
    }

    /// True iff all four corner samples are non-air solid. A failing
    /// receipt is still accepted, but gets flagged suspect in logs.
    pub fn verify_foundation_corners(&self) -> bool {
        self.foundation_corners
            .iter()
            .all(|sample| sample.material.is_solid())
    }

    /// Fixed one-line summary, stable for log parsers.
    pub fn summary(&self) -> String {
        let b = &self.bounds;
        format!(
            "[STRUCT][RECEIPT] id={} village={} origin=({},{},{}) rot={} dims={}x{}x{} bounds=({},{},{})..({},{},{}) entrance=({},{},{}) corners={}",
            self.structure_id,
            self.village_id,
            self.origin.x,
            self.origin.y,
            self.origin.z,
            self.rotation.degrees(),
            self.effective_width,
            self.height,
            self.effective_depth,
            b.min.x,
            b.min.y,
            b.min.z,
            b.max.x,
            b.max.y,
            b.max.z,
            self.entrance.x,
            self.entrance.y,
            self.entrance.z,
            if self.verify_foundation_corners() { "ok" } else { "suspect" },
        )
    }
}

#[cfg(test)]
pub mod tests_support {
    use super::*;

    pub fn sample_receipt() -> PlacementReceipt {
        let bounds = Aabb::new(BlockPos::new(0, 64, 0), BlockPos::new(8, 70, 6));
        let corner = |corner, x, z| CornerSample {
            corner,
            pos: BlockPos::new(x, 64, z),
            material: BlockMaterial::Cobblestone,
        };
        PlacementReceipt {
            structure_id: "forum".to_string(),
            village_id: Uuid::from_u128(0xfeed),
            bounds,
            origin: BlockPos::new(0, 64, 0),
            rotation: Rotation::None,
            effective_width: 9,
            effective_depth: 7,
            height: 7,
            foundation_corners: [
                corner(Corner::NW, 0, 0),
                corner(Corner::NE, 8, 0),
                corner(Corner::SE, 8, 6),
                corner(Corner::SW, 0, 6),
            ],
            entrance: BlockPos::new(4, 65, 9),
            timestamp: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::sample_receipt;
    use super::*;

    #[test]
    fn well_formed_receipt_passes_checks() {
        let receipt = sample_receipt();
        assert!(receipt.is_well_formed());
        assert!(receipt.verify_foundation_corners());
    }

    #[test]
    fn air_corner_marks_receipt_suspect() {
        let mut receipt = sample_receipt();
        receipt.foundation_corners[2].material = BlockMaterial::Air;
        assert!(!receipt.verify_foundation_corners());
        assert!(receipt.summary().ends_with("corners=suspect"));
    }

    #[test]
    fn misplaced_corner_is_malformed() {
        let mut receipt = sample_receipt();
        receipt.foundation_corners[1].pos.x += 1;
        assert!(!receipt.is_well_formed());
    }

    #[test]
    fn summary_is_stable() {
        let receipt = sample_receipt();
        assert_eq!(
            receipt.summary(),
            format!(
                "[STRUCT][RECEIPT] id=forum village={} origin=(0,64,0) rot=0 dims=9x7x7 bounds=(0,64,0)..(8,70,6) entrance=(4,65,9) corners=ok",
                Uuid::from_u128(0xfeed)
            )
        );
    }
}
