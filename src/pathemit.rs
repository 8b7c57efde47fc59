use crate::block::Facing;
use crate::catalog::PathPalette;
use crate::config::GeneratorConfig;
use crate::constants::*;
use crate::geom::BlockPos;
use crate::mask::{any_mask_contains, VolumeMask};
use crate::surface::SurfaceSolver;
use crate::world::WorldProvider;
use fnv::FnvHashSet;
use log::{debug, info};

/// What one emission pass did, for logs and assertions.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EmitStats {
    pub placed: usize,
    pub widened: usize,
    pub stairs: usize,
    pub slabs: usize,
    pub skipped: usize,
}

/// Materializes a planned route: re-grounds every node at emission time,
/// lays the culture's path material, keeps head clearance, widens one
/// block to each side where terrain allows, and smooths single-block
/// rises with stairs and long flat runs with slabs. Masked or
/// unsupported cells are skipped, never forced.
pub struct PathEmitter<'a> {
    palette: PathPalette,
    masks: &'a [VolumeMask],
    config: &'a GeneratorConfig,
}

impl<'a> PathEmitter<'a> {
    pub fn new(palette: PathPalette, masks: &'a [VolumeMask], config: &'a GeneratorConfig) -> PathEmitter<'a> {
        PathEmitter {
            palette,
            masks,
            config,
        }
    }

    pub fn emit(&self, world: &mut dyn WorldProvider, nodes: &[BlockPos]) -> EmitStats {
        let mut stats = EmitStats::default();
        let mut visited: FnvHashSet<(i32, i32)> = FnvHashSet::default();
        // Ground cells actually laid, in traversal order.
        let mut laid: Vec<BlockPos> = Vec::new();

        for node in nodes {
            let (x, z) = (node.x, node.z);
            if !visited.insert((x, z)) {
                continue;
            }
            if any_mask_contains(self.masks, x, node.y, z) {
                stats.skipped += 1;
                continue;
            }
            let ground = {
                let solver = SurfaceSolver::with_extra_ground(
                    &*world,
                    self.masks,
                    &self.config.natural_ground_extra,
                );
                solver.surface_height(x, z)
            };
            let Some(h) = ground else {
                stats.skipped += 1;
                continue;
            };
            let below = world.block_at(x, h - 1, z);
            let supported = below.is_natural_ground()
                || below.is_path_material()
                || self.config.natural_ground_extra.contains(&below);
            if !supported
                || any_mask_contains(self.masks, x, h, z)
                || any_mask_contains(self.masks, x, h - 1, z)
            {
                stats.skipped += 1;
                continue;
            }

            world.set_block(x, h, z, self.palette.path);
            stats.placed += 1;
            laid.push(BlockPos::new(x, h, z));

            for dy in 1..=PATH_CLEARANCE_HEIGHT {
                if any_mask_contains(self.masks, x, h + dy, z) {
                    continue;
                }
                let above = world.block_at(x, h + dy, z);
                if !above.is_air() && !above.is_fluid() {
                    world.set_block(x, h + dy, z, crate::block::BlockMaterial::Air);
                }
            }
        }

        stats.widened = self.widen(world, &laid);
        let (stairs, slabs) = self.smooth(world, &laid);
        stats.stairs = stairs;
        stats.slabs = slabs;

        if self.config.debug_paths {
            debug!(
                "[PATH] emitted: placed={} widened={} stairs={} slabs={} skipped={}",
                stats.placed, stats.widened, stats.stairs, stats.slabs, stats.skipped
            );
        } else {
            info!("[PATH] emitted {} path blocks", stats.placed + stats.widened);
        }
        stats
    }

    /// One-pass widening: each laid block offers path material to its
    /// replaceable, supported, unmasked 4-neighbors at the same level.
    fn widen(&self, world: &mut dyn WorldProvider, laid: &[BlockPos]) -> usize {
        let mut widened = 0usize;
        for block in laid {
            for (dx, dz) in [(-1, 0), (0, 1), (1, 0), (0, -1)] {
                let (x, y, z) = (block.x + dx, block.y, block.z + dz);
                if !world.block_at(x, y, z).is_replaceable() {
                    continue;
                }
                let below = world.block_at(x, y - 1, z);
                if !below.is_solid() {
                    continue;
                }
                if any_mask_contains(self.masks, x, y, z)
                    || any_mask_contains(self.masks, x, y - 1, z)
                {
                    continue;
                }
                world.set_block(x, y, z, self.palette.path);
                widened += 1;
            }
        }
        widened
    }

    /// One-pass smoothing: a stair on each single-block elevation change
    /// (on the lower tile, ascending toward the higher), a slab every
    /// Nth tile of a flat run.
    fn smooth(&self, world: &mut dyn WorldProvider, laid: &[BlockPos]) -> (usize, usize) {
        let mut stairs = 0usize;
        let mut slabs = 0usize;
        let mut flat_run = 0usize;

        for pair in laid.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let dy = b.y - a.y;
            if dy.abs() == 1 {
                flat_run = 0;
                let (low, high) = if dy > 0 { (a, b) } else { (b, a) };
                let facing = Facing::from_delta(high.x - low.x, high.z - low.z);
                if world.block_at(low.x, low.y - 1, low.z).is_solid()
                    && !any_mask_contains(self.masks, low.x, low.y, low.z)
                {
                    world.set_block_facing(low.x, low.y, low.z, self.palette.stair, facing);
                    stairs += 1;
                }
            } else if dy == 0 {
                flat_run += 1;
                if flat_run % PATH_SLAB_INTERVAL == 0 {
                    if world.block_at(b.x, b.y - 1, b.z).is_solid()
                        && !any_mask_contains(self.masks, b.x, b.y, b.z)
                    {
                        world.set_block(b.x, b.y, b.z, self.palette.slab);
                        slabs += 1;
                    }
                }
            } else {
                flat_run = 0;
            }
        }
        (stairs, slabs)
    }
}
