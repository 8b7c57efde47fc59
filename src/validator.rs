use crate::block::BlockMaterial;
use crate::constants::*;
use crate::geom::Aabb;
use crate::world::WorldProvider;
use itertools::iproduct;
use serde::{Deserialize, Serialize};

/// Classification of a single foundation tile.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TileClass {
    Solid,
    Fluid,
    Steep,
    Blocked,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TileCounts {
    pub solid: u32,
    pub fluid: u32,
    pub steep: u32,
    pub blocked: u32,
}

impl TileCounts {
    fn record(&mut self, class: TileClass) {
        match class {
            TileClass::Solid => self.solid += 1,
            TileClass::Fluid => self.fluid += 1,
            TileClass::Steep => self.steep += 1,
            TileClass::Blocked => self.blocked += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.solid + self.fluid + self.steep + self.blocked
    }
}

/// Accept/reject verdict with the per-check breakdown.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ValidationResult {
    pub passed: bool,
    pub foundation_ok: bool,
    pub interior_air_ok: bool,
    pub entrance_ok: bool,
    pub counts: TileCounts,
}

/// Read-only site inspection for a proposed placement volume. Any fluid
/// tile in the footprint is a hard reject; the remaining checks grade the
/// foundation, the interior volume, and outside access.
pub struct SiteValidator<'a> {
    world: &'a dyn WorldProvider,
    extra_ground: &'a [BlockMaterial],
}

impl<'a> SiteValidator<'a> {
    pub fn new(world: &'a dyn WorldProvider) -> SiteValidator<'a> {
        SiteValidator {
            world,
            extra_ground: &[],
        }
    }

    pub fn with_extra_ground(
        world: &'a dyn WorldProvider,
        extra_ground: &'a [BlockMaterial],
    ) -> SiteValidator<'a> {
        SiteValidator {
            world,
            extra_ground,
        }
    }

    fn is_ground(&self, material: BlockMaterial) -> bool {
        material.is_natural_ground() || self.extra_ground.contains(&material)
    }

    /// First block from the top of the column that is not air or plant
    /// cover, bounded below by the world floor.
    fn probe_column(&self, x: i32, z: i32) -> Option<(i32, BlockMaterial)> {
        let mut y = self.world.highest_block_y(x, z)?;
        let floor = self.world.min_height();
        while y >= floor {
            let material = self.world.block_at(x, y, z);
            if !material.is_air() && !material.is_vegetation() {
                return Some((y, material));
            }
            y -= 1;
        }
        None
    }

    fn classify_tile(&self, x: i32, z: i32, base_plane: i32) -> TileClass {
        let Some((ground_y, material)) = self.probe_column(x, z) else {
            return TileClass::Blocked;
        };
        if material.is_fluid() {
            return TileClass::Fluid;
        }
        if (ground_y - base_plane).abs() > STEEP_DELTA {
            return TileClass::Steep;
        }
        if self.is_ground(material) {
            TileClass::Solid
        } else {
            TileClass::Blocked
        }
    }

    /// Inspect the exact placement volume. The base plane is the layer
    /// directly below `bounds.min.y`.
    pub fn validate(&self, bounds: &Aabb) -> ValidationResult {
        let base_plane = bounds.min.y - 1;

        let mut counts = TileCounts::default();
        for (x, z) in iproduct!(bounds.min.x..=bounds.max.x, bounds.min.z..=bounds.max.z) {
            counts.record(self.classify_tile(x, z, base_plane));
        }

        let total = counts.total().max(1) as f32;
        let foundation_ok =
            counts.fluid == 0 && counts.solid as f32 / total >= FOUNDATION_SOLID_FRACTION;

        let mut replaceable = 0u32;
        let mut cells = 0u32;
        for (x, y, z) in iproduct!(
            bounds.min.x..=bounds.max.x,
            bounds.min.y..=bounds.max.y,
            bounds.min.z..=bounds.max.z
        ) {
            cells += 1;
            if self.world.block_at(x, y, z).is_replaceable() {
                replaceable += 1;
            }
        }
        let interior_air_ok = replaceable as f32 / cells.max(1) as f32 >= INTERIOR_AIR_FRACTION;

        let entrance_ok = self.has_outside_access(bounds, base_plane);

        ValidationResult {
            passed: counts.fluid == 0 && foundation_ok && interior_air_ok && entrance_ok,
            foundation_ok,
            interior_air_ok,
            entrance_ok,
            counts,
        }
    }

    /// At least one tile adjacent to the footprint must be walkable ground
    /// within a one-block step of the base plane.
    fn has_outside_access(&self, bounds: &Aabb, base_plane: i32) -> bool {
        let mut ring = Vec::new();
        for x in (bounds.min.x - 1)..=(bounds.max.x + 1) {
            ring.push((x, bounds.min.z - 1));
            ring.push((x, bounds.max.z + 1));
        }
        for z in bounds.min.z..=bounds.max.z {
            ring.push((bounds.min.x - 1, z));
            ring.push((bounds.max.x + 1, z));
        }
        ring.into_iter().any(|(x, z)| {
            self.probe_column(x, z).is_some_and(|(y, material)| {
                self.is_ground(material) && (y - base_plane).abs() <= 1
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BlockPos;
    use crate::world::GridWorld;

    fn volume_at(y: i32) -> Aabb {
        Aabb::new(BlockPos::new(0, y, 0), BlockPos::new(6, y + 4, 6))
    }

    #[test]
    fn flat_grass_site_passes() {
        let world = GridWorld::flat("test", 64);
        let result = SiteValidator::new(&world).validate(&volume_at(65));
        assert!(result.passed);
        assert_eq!(result.counts.solid, 49);
        assert_eq!(result.counts.fluid, 0);
    }

    #[test]
    fn any_fluid_tile_is_a_hard_reject() {
        let mut world = GridWorld::flat("test", 64);
        world.flood_rect(3, 3, 3, 3, 58, 64);
        let result = SiteValidator::new(&world).validate(&volume_at(65));
        assert!(!result.passed);
        assert_eq!(result.counts.fluid, 1);
    }

    #[test]
    fn cliff_edges_count_steep() {
        let mut world = GridWorld::flat("test", 64);
        world.raise_rect(0, 0, 2, 6, 72);
        let result = SiteValidator::new(&world).validate(&volume_at(65));
        assert!(!result.foundation_ok);
        assert_eq!(result.counts.steep, 21);
    }

    #[test]
    fn buried_volume_fails_the_interior_check() {
        let world = GridWorld::flat("test", 64);
        // Validate a volume sunk into the ground.
        let result = SiteValidator::new(&world).validate(&volume_at(55));
        assert!(!result.interior_air_ok);
        assert!(!result.passed);
    }

    #[test]
    fn man_made_surface_blocks_the_tile() {
        let mut world = GridWorld::flat("test", 64);
        for x in 0..=6 {
            for z in 0..=6 {
                world.set_surface_material(x, z, BlockMaterial::Cobblestone);
            }
        }
        let result = SiteValidator::new(&world).validate(&volume_at(65));
        assert_eq!(result.counts.blocked, 49);
        assert!(!result.foundation_ok);
    }
}
