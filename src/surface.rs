use crate::block::BlockMaterial;
use crate::mask::VolumeMask;
use crate::world::WorldProvider;

/// Ground oracle: the highest natural-ground block in a column, ignoring
/// everything inside registered masks.
///
/// Solvers are cheap views; one is created fresh after every structure
/// commit so the mask list is never stale. They borrow the mask slice
/// rather than copying it.
pub struct SurfaceSolver<'a> {
    world: &'a dyn WorldProvider,
    masks: &'a [VolumeMask],
    extra_ground: &'a [BlockMaterial],
}

impl<'a> SurfaceSolver<'a> {
    pub fn new(world: &'a dyn WorldProvider, masks: &'a [VolumeMask]) -> SurfaceSolver<'a> {
        SurfaceSolver {
            world,
            masks,
            extra_ground: &[],
        }
    }

    /// Extend the natural-ground whitelist (configuration hook for exotic
    /// terrain).
    pub fn with_extra_ground(
        world: &'a dyn WorldProvider,
        masks: &'a [VolumeMask],
        extra_ground: &'a [BlockMaterial],
    ) -> SurfaceSolver<'a> {
        SurfaceSolver {
            world,
            masks,
            extra_ground,
        }
    }

    pub fn is_natural_ground(&self, material: BlockMaterial) -> bool {
        material.is_natural_ground() || self.extra_ground.contains(&material)
    }

    fn masked(&self, x: i32, y: i32, z: i32) -> bool {
        self.masks.iter().any(|m| m.contains(x, y, z))
    }

    /// Highest `y` with natural ground at `(x, y, z)`, skipping vegetation,
    /// fluids, masked voxels and man-made solids on the way down.
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        let mut y = self.world.highest_block_y(x, z)?;
        let floor = self.world.min_height();
        while y >= floor {
            if self.masked(x, y, z) {
                y -= 1;
                continue;
            }
            let material = self.world.block_at(x, y, z);
            if self.is_natural_ground(material) {
                return Some(y);
            }
            y -= 1;
        }
        None
    }

    /// The level a walker occupies above the ground at `(x, z)`.
    pub fn walk_level(&self, x: i32, z: i32) -> Option<i32> {
        self.surface_height(x, z).map(|y| y + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Aabb, BlockPos};
    use crate::world::GridWorld;
    use uuid::Uuid;

    #[test]
    fn plain_column_returns_the_grass_top() {
        let world = GridWorld::flat("test", 64);
        let solver = SurfaceSolver::new(&world, &[]);
        assert_eq!(solver.surface_height(3, 3), Some(64));
        assert_eq!(solver.walk_level(3, 3), Some(65));
    }

    #[test]
    fn vegetation_and_fluid_are_skipped() {
        let mut world = GridWorld::flat("test", 64);
        world.set_block(0, 65, 0, BlockMaterial::TallGrass);
        world.flood_rect(5, 5, 5, 5, 58, 62);
        let solver = SurfaceSolver::new(&world, &[]);
        assert_eq!(solver.surface_height(0, 0), Some(64));
        // Water column: the solver descends to the sand bed.
        assert_eq!(solver.surface_height(5, 5), Some(58));
    }

    #[test]
    fn masked_blocks_are_invisible() {
        let mut world = GridWorld::flat("test", 64);
        // A committed floor sits on the old surface; its mask hides it and
        // the grass beneath stays the answer only when unmasked.
        world.set_block(2, 65, 2, BlockMaterial::OakPlanks);
        let masks = [VolumeMask::solid(
            "house",
            Uuid::from_u128(1),
            Aabb::new(BlockPos::new(2, 65, 2), BlockPos::new(4, 70, 4)),
            0,
        )];

        let unmasked = SurfaceSolver::new(&world, &[]);
        // Without the mask the planks are skipped as man-made anyway.
        assert_eq!(unmasked.surface_height(2, 2), Some(64));

        let solver = SurfaceSolver::new(&world, &masks);
        assert_eq!(solver.surface_height(2, 2), Some(64));
    }

    #[test]
    fn masked_ground_is_skipped_too() {
        let world = GridWorld::flat("test", 64);
        let masks = [VolumeMask::solid(
            "cellar",
            Uuid::from_u128(1),
            Aabb::new(BlockPos::new(0, 63, 0), BlockPos::new(1, 70, 1)),
            0,
        )];
        let solver = SurfaceSolver::new(&world, &masks);
        // Grass at 64 and dirt at 63 are masked; first visible natural
        // ground is the dirt at 62.
        assert_eq!(solver.surface_height(1, 1), Some(62));
    }

    #[test]
    fn whitelist_extension_accepts_configured_materials() {
        let mut world = GridWorld::flat("test", 64);
        world.set_surface_material(7, 7, BlockMaterial::OakPlanks);
        let solver = SurfaceSolver::new(&world, &[]);
        assert_eq!(solver.surface_height(7, 7), Some(63));

        let extra = [BlockMaterial::OakPlanks];
        let lenient = SurfaceSolver::with_extra_ground(&world, &[], &extra);
        assert_eq!(lenient.surface_height(7, 7), Some(64));
    }
}
