use crate::block::BlockMaterial;
use crate::error::AttemptError;
use crate::geom::Aabb;
use crate::world::WorldProvider;
use itertools::iproduct;
use log::debug;

/// Site preparation strictly inside an exact AABB: raise sunk foundation
/// tiles, clear terrain bumps, trees and plant cover from the placement
/// volume. Fluid contact anywhere in the footprint or the adjacent ring
/// aborts before the first mutation, so a failed prepare leaves the world
/// untouched.
pub struct Terraformer {
    /// Also backfill the one-tile ring below the base plane, supporting
    /// overhang terrain. Config-gated, off by default.
    pub backfill_ring: bool,
    pub log_changes: bool,
}

impl Default for Terraformer {
    fn default() -> Terraformer {
        Terraformer {
            backfill_ring: false,
            log_changes: false,
        }
    }
}

struct ColumnPlan {
    x: i32,
    z: i32,
    /// Highest solid block below the base plane.
    ground_y: i32,
    in_footprint: bool,
}

impl Terraformer {
    /// Level and fill within `bounds`. Mutations never extend past the
    /// supplied box (ring backfill below the base plane excepted, when
    /// explicitly enabled).
    pub fn prepare(&self, world: &mut dyn WorldProvider, bounds: &Aabb) -> Result<(), AttemptError> {
        let base_plane = bounds.min.y - 1;
        let floor = world.min_height();
        let mut columns = Vec::new();

        // Scan pass: find per-column ground and abort on any fluid before
        // mutating. Fluid in the interior volume counts too.
        for (x, z) in iproduct!(
            (bounds.min.x - 1)..=(bounds.max.x + 1),
            (bounds.min.z - 1)..=(bounds.max.z + 1)
        ) {
            let in_footprint = bounds.footprint_contains(x, z);

            if in_footprint {
                for y in bounds.min.y..=bounds.max.y {
                    if world.block_at(x, y, z).is_fluid() {
                        return Err(AttemptError::TerraformingAborted { x, z });
                    }
                }
            } else {
                // Adjacent ring: only the base layers matter.
                if world.block_at(x, base_plane, z).is_fluid()
                    || world.block_at(x, bounds.min.y, z).is_fluid()
                {
                    return Err(AttemptError::TerraformingAborted { x, z });
                }
            }

            let mut ground_y = floor;
            let mut y = base_plane;
            while y >= floor {
                let material = world.block_at(x, y, z);
                if material.is_fluid() {
                    return Err(AttemptError::TerraformingAborted { x, z });
                }
                if material.is_solid() {
                    ground_y = y;
                    break;
                }
                y -= 1;
            }

            if in_footprint || self.backfill_ring {
                columns.push(ColumnPlan {
                    x,
                    z,
                    ground_y,
                    in_footprint,
                });
            }
        }

        // Mutation pass.
        let mut raised = 0u32;
        let mut cleared = 0u32;
        for column in &columns {
            if column.in_footprint {
                for y in bounds.min.y..=bounds.max.y {
                    let material = world.block_at(column.x, y, column.z);
                    let removable = material.is_clearable()
                        || (material.is_solid() && material != BlockMaterial::Bedrock);
                    if removable {
                        world.set_block(column.x, y, column.z, BlockMaterial::Air);
                        cleared += 1;
                    }
                }
            }

            for y in (column.ground_y + 1)..=base_plane {
                world.set_block(column.x, y, column.z, BlockMaterial::Dirt);
                raised += 1;
            }
        }

        if self.log_changes && (raised > 0 || cleared > 0) {
            debug!(
                "[STRUCT] terraformed ({},{},{})..({},{},{}): raised={} cleared={}",
                bounds.min.x, bounds.min.y, bounds.min.z,
                bounds.max.x, bounds.max.y, bounds.max.z,
                raised, cleared
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BlockPos;
    use crate::world::GridWorld;

    fn volume() -> Aabb {
        Aabb::new(BlockPos::new(0, 65, 0), BlockPos::new(4, 69, 4))
    }

    #[test]
    fn flat_site_needs_no_changes() {
        let mut world = GridWorld::flat("test", 64);
        Terraformer::default().prepare(&mut world, &volume()).unwrap();
        assert_eq!(world.block_at(2, 64, 2), BlockMaterial::Grass);
        assert_eq!(world.block_at(2, 65, 2), BlockMaterial::Air);
    }

    #[test]
    fn sunk_tiles_are_raised_to_the_base_plane() {
        let mut world = GridWorld::flat("test", 64);
        world.set_ground_height(1, 1, 61);
        Terraformer::default().prepare(&mut world, &volume()).unwrap();
        assert_eq!(world.block_at(1, 62, 1), BlockMaterial::Dirt);
        assert_eq!(world.block_at(1, 64, 1), BlockMaterial::Dirt);
        assert_eq!(world.block_at(1, 65, 1), BlockMaterial::Air);
    }

    #[test]
    fn bumps_and_trees_inside_the_volume_are_cleared() {
        let mut world = GridWorld::flat("test", 64);
        world.raise_rect(3, 3, 3, 3, 66);
        world.set_block(2, 65, 2, BlockMaterial::OakLog);
        world.set_block(2, 66, 2, BlockMaterial::OakLeaves);
        Terraformer::default().prepare(&mut world, &volume()).unwrap();
        assert_eq!(world.block_at(3, 65, 3), BlockMaterial::Air);
        assert_eq!(world.block_at(3, 66, 3), BlockMaterial::Air);
        assert_eq!(world.block_at(2, 65, 2), BlockMaterial::Air);
        assert_eq!(world.block_at(2, 66, 2), BlockMaterial::Air);
    }

    #[test]
    fn fluid_in_the_footprint_aborts_without_mutation() {
        let mut world = GridWorld::flat("test", 64);
        world.flood_rect(2, 2, 2, 2, 58, 64);
        world.set_ground_height(1, 1, 60);
        let err = Terraformer::default().prepare(&mut world, &volume());
        assert!(matches!(err, Err(AttemptError::TerraformingAborted { .. })));
        // The sunk neighbor column was not raised.
        assert_eq!(world.block_at(1, 62, 1), BlockMaterial::Air);
    }

    #[test]
    fn fluid_on_the_adjacent_ring_aborts() {
        let mut world = GridWorld::flat("test", 64);
        world.flood_rect(5, 0, 5, 0, 60, 64);
        let err = Terraformer::default().prepare(&mut world, &volume());
        assert!(matches!(
            err,
            Err(AttemptError::TerraformingAborted { x: 5, z: 0 })
        ));
    }

    #[test]
    fn ring_backfill_is_opt_in() {
        let mut world = GridWorld::flat("test", 64);
        world.set_ground_height(-1, 2, 60);

        Terraformer::default().prepare(&mut world, &volume()).unwrap();
        assert_eq!(world.block_at(-1, 62, 2), BlockMaterial::Air);

        let aggressive = Terraformer {
            backfill_ring: true,
            ..Terraformer::default()
        };
        aggressive.prepare(&mut world, &volume()).unwrap();
        assert_eq!(world.block_at(-1, 62, 2), BlockMaterial::Dirt);
        assert_eq!(world.block_at(-1, 64, 2), BlockMaterial::Dirt);
    }
}
