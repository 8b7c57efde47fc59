use crate::geom::Aabb;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A committed structure volume that later steps must treat as opaque.
///
/// Bounds are inclusive. The optional occupancy bitmap refines the box to
/// the exact voxels a clipboard filled; a missing bitmap means the whole
/// box is occupied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeMask {
    pub structure_id: String,
    pub village_id: Uuid,
    pub bounds: Aabb,
    pub timestamp: u64,
    /// Bit-packed occupancy, indexed `(x - minX, y - minY, z - minZ)`
    /// row-major in `(z, y, x)` order.
    #[serde(default, with = "bitmap_serde", skip_serializing_if = "Option::is_none")]
    pub occupancy_bitmap: Option<Vec<u8>>,
}

impl VolumeMask {
    pub fn solid(structure_id: impl Into<String>, village_id: Uuid, bounds: Aabb, timestamp: u64) -> VolumeMask {
        VolumeMask {
            structure_id: structure_id.into(),
            village_id,
            bounds,
            timestamp,
            occupancy_bitmap: None,
        }
    }

    pub fn with_bitmap(
        structure_id: impl Into<String>,
        village_id: Uuid,
        bounds: Aabb,
        timestamp: u64,
        bitmap: Vec<u8>,
    ) -> VolumeMask {
        VolumeMask {
            structure_id: structure_id.into(),
            village_id,
            bounds,
            timestamp,
            occupancy_bitmap: Some(bitmap),
        }
    }

    /// Byte length needed for a bitmap covering `bounds`.
    pub fn bitmap_len(bounds: &Aabb) -> usize {
        let cells = bounds.width() as usize * bounds.height() as usize * bounds.depth() as usize;
        (cells + 7) / 8
    }

    fn bit_index(&self, x: i32, y: i32, z: i32) -> usize {
        let dx = (x - self.bounds.min.x) as usize;
        let dy = (y - self.bounds.min.y) as usize;
        let dz = (z - self.bounds.min.z) as usize;
        let w = self.bounds.width() as usize;
        let h = self.bounds.height() as usize;
        (dz * h + dy) * w + dx
    }

    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.bounds.contains(x, y, z) {
            return false;
        }
        match &self.occupancy_bitmap {
            None => true,
            Some(bits) => {
                let idx = self.bit_index(x, y, z);
                bits.get(idx / 8).is_some_and(|byte| byte & (1 << (idx % 8)) != 0)
            }
        }
    }

    /// A buffered copy of this mask. The bitmap no longer matches the
    /// inflated bounds so it is dropped, falling back to full occupancy.
    pub fn expand(&self, buf: i32) -> VolumeMask {
        VolumeMask {
            structure_id: self.structure_id.clone(),
            village_id: self.village_id,
            bounds: self.bounds.expand(buf),
            timestamp: self.timestamp,
            occupancy_bitmap: None,
        }
    }

    /// Mark a voxel occupied, allocating an all-clear bitmap on first use.
    pub fn set_occupied(&mut self, x: i32, y: i32, z: i32) {
        if !self.bounds.contains(x, y, z) {
            return;
        }
        let len = VolumeMask::bitmap_len(&self.bounds);
        let idx = self.bit_index(x, y, z);
        let bits = self.occupancy_bitmap.get_or_insert_with(|| vec![0u8; len]);
        bits[idx / 8] |= 1 << (idx % 8);
    }
}

/// True if any mask in the list covers the voxel.
pub fn any_mask_contains(masks: &[VolumeMask], x: i32, y: i32, z: i32) -> bool {
    masks.iter().any(|m| m.contains(x, y, z))
}

/// Buffered 3-axis overlap test of a candidate box against the mask list.
pub fn collides_with_masks(candidate: &Aabb, buffer: i32, masks: &[VolumeMask]) -> bool {
    let inflated = candidate.expand(buffer);
    masks.iter().any(|m| inflated.intersects(&m.bounds))
}

/// Occupancy bitmaps travel as base64 so village files stay line-oriented.
mod bitmap_serde {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bits: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        bits.as_ref().map(|b| STANDARD.encode(b)).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BlockPos;

    fn bounds() -> Aabb {
        Aabb::new(BlockPos::new(0, 60, 0), BlockPos::new(4, 63, 4))
    }

    #[test]
    fn solid_mask_covers_whole_box() {
        let mask = VolumeMask::solid("house", Uuid::from_u128(1), bounds(), 0);
        assert!(mask.contains(0, 60, 0));
        assert!(mask.contains(4, 63, 4));
        assert!(!mask.contains(5, 60, 0));
        assert!(!mask.contains(0, 59, 0));
    }

    #[test]
    fn bitmap_refines_the_box() {
        let mut mask = VolumeMask::solid("house", Uuid::from_u128(1), bounds(), 0);
        mask.set_occupied(1, 61, 2);
        assert!(mask.contains(1, 61, 2));
        assert!(!mask.contains(1, 62, 2));
        assert!(!mask.contains(0, 60, 0));
    }

    #[test]
    fn expansion_drops_the_bitmap() {
        let mut mask = VolumeMask::solid("house", Uuid::from_u128(1), bounds(), 0);
        mask.set_occupied(1, 61, 2);
        let grown = mask.expand(2);
        assert!(grown.occupancy_bitmap.is_none());
        assert!(grown.contains(-2, 58, -2));
        assert!(grown.contains(6, 65, 6));
    }

    #[test]
    fn bitmap_round_trips_through_base64_json() {
        let mut mask = VolumeMask::solid("house", Uuid::from_u128(7), bounds(), 42);
        mask.set_occupied(3, 60, 1);
        mask.set_occupied(0, 63, 4);
        let json = serde_json::to_string(&mask).unwrap();
        let back: VolumeMask = serde_json::from_str(&json).unwrap();
        assert_eq!(mask, back);
    }

    #[test]
    fn buffered_collision_respects_spacing() {
        let a = VolumeMask::solid("a", Uuid::from_u128(1), bounds(), 0);
        let far = Aabb::new(BlockPos::new(9, 60, 0), BlockPos::new(12, 63, 4));
        assert!(!collides_with_masks(&far, 2, std::slice::from_ref(&a)));
        let near = Aabb::new(BlockPos::new(6, 60, 0), BlockPos::new(9, 63, 4));
        assert!(collides_with_masks(&near, 2, std::slice::from_ref(&a)));
    }
}
