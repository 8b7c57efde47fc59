use crate::block::BlockMaterial;
use crate::config::GeneratorConfig;
use crate::constants::*;
use crate::error::PathError;
use crate::geom::BlockPos;
use crate::mask::{any_mask_contains, VolumeMask};
use crate::world::WorldProvider;
use log::{debug, info};
use pathfinding::directed::astar::astar;
use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A planned route at walk level, with its determinism digest.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedPath {
    pub nodes: Vec<BlockPos>,
    pub cost: u32,
    pub explored: usize,
    pub hash: u64,
}

/// Digest of an ordered node list. Emitted per completed path so two
/// runs of the same seed can be compared from logs alone.
pub fn path_hash(nodes: &[BlockPos]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for node in nodes {
        node.x.hash(&mut hasher);
        node.y.hash(&mut hasher);
        node.z.hash(&mut hasher);
    }
    hasher.finish()
}

/// Terrain-cost A* over the walk lattice: 8 planar neighbors, each at
/// three vertical offsets. Nodes are walk cells; the block below a node
/// must be natural ground, and neither the node nor the block below may
/// lie inside any village mask. Work is bounded by node budget and a
/// range pre-check.
pub struct PathPlanner<'a> {
    world: &'a dyn WorldProvider,
    masks: &'a [VolumeMask],
    config: &'a GeneratorConfig,
}

impl<'a> PathPlanner<'a> {
    pub fn new(
        world: &'a dyn WorldProvider,
        masks: &'a [VolumeMask],
        config: &'a GeneratorConfig,
    ) -> PathPlanner<'a> {
        PathPlanner {
            world,
            masks,
            config,
        }
    }

    fn is_ground(&self, material: BlockMaterial) -> bool {
        material.is_natural_ground() || self.config.natural_ground_extra.contains(&material)
    }

    /// Cost of stepping onto `to`, or `None` when the step is impassable.
    fn step_cost(&self, from: (i32, i32, i32), to: (i32, i32, i32)) -> Option<u32> {
        let (x, y, z) = to;

        if any_mask_contains(self.masks, x, y, z) {
            return None;
        }
        // No walking on roofs: the support block may not be masked either.
        if any_mask_contains(self.masks, x, y - 1, z) {
            return None;
        }
        let below = self.world.block_at(x, y - 1, z);
        if !self.is_ground(below) {
            return None;
        }

        let mut cost = PATH_COST_FLAT;

        let dy = y - from.1;
        if dy > 0 {
            if dy > self.config.path_max_slope {
                return None;
            }
            cost += dy as u32 * PATH_COST_SLOPE_PER_BLOCK;
        }

        let at = self.world.block_at(x, y, z);
        if at.is_fluid() {
            cost += PATH_COST_WATER;
        } else if at.is_solid() {
            if at.is_obstruction() {
                return None;
            }
            if !at.is_natural_terrain() {
                cost += PATH_COST_UNKNOWN_SOLID;
            }
        }

        if cost >= PATH_OBSTACLE_COST {
            return None;
        }
        Some(cost)
    }

    /// Route from `start` to within +-2 on x and z of `goal`.
    pub fn plan(&self, start: BlockPos, goal: BlockPos) -> Result<PlannedPath, PathError> {
        let max_distance = self.config.path_max_distance;
        let dist_sq = start.euclid_sq_xz(goal);
        if dist_sq > (max_distance as i64) * (max_distance as i64)
            || dist_sq < (MIN_SEARCH_DISTANCE as i64) * (MIN_SEARCH_DISTANCE as i64)
        {
            return Err(PathError::OutOfRange {
                distance: (dist_sq as f64).sqrt() as i32,
                min: MIN_SEARCH_DISTANCE,
                max: max_distance,
            });
        }

        let expanded = Cell::new(0usize);
        let max_nodes = self.config.path_max_nodes;
        let min_y = self.world.min_height();
        let max_y = self.world.max_height();

        let result = astar(
            &(start.x, start.y, start.z),
            |&(x, y, z)| {
                // Bounded work: past the budget no node expands further;
                // anything already queued may still finish the search.
                if expanded.get() >= max_nodes {
                    return Vec::new();
                }
                expanded.set(expanded.get() + 1);

                let mut neighbors = Vec::with_capacity(24);
                for dx in -1..=1i32 {
                    for dz in -1..=1i32 {
                        if dx == 0 && dz == 0 {
                            continue;
                        }
                        for dy in -1..=1i32 {
                            let to = (x + dx, y + dy, z + dz);
                            if to.1 <= min_y || to.1 > max_y {
                                continue;
                            }
                            if let Some(cost) = self.step_cost((x, y, z), to) {
                                neighbors.push((to, cost));
                            }
                        }
                    }
                }
                neighbors
            },
            |&(x, _, z)| ((x - goal.x).abs() + (z - goal.z).abs()) as u32 * PATH_COST_FLAT,
            |&(x, _, z)| {
                (x - goal.x).abs() <= PATH_GOAL_TOLERANCE && (z - goal.z).abs() <= PATH_GOAL_TOLERANCE
            },
        );

        match result {
            Some((path, cost)) => {
                let nodes: Vec<BlockPos> =
                    path.into_iter().map(|(x, y, z)| BlockPos::new(x, y, z)).collect();
                let hash = path_hash(&nodes);
                info!(
                    "[PATH] planned ({},{},{}) -> ({},{},{}): nodes={} cost={} explored={} hash={:016x}",
                    start.x,
                    start.y,
                    start.z,
                    goal.x,
                    goal.y,
                    goal.z,
                    nodes.len(),
                    cost,
                    expanded.get(),
                    hash
                );
                Ok(PlannedPath {
                    nodes,
                    cost,
                    explored: expanded.get(),
                    hash,
                })
            }
            None => {
                if self.config.debug_paths {
                    debug!(
                        "[PATH] no route ({},{},{}) -> ({},{},{}) after {} expansions",
                        start.x, start.y, start.z, goal.x, goal.y, goal.z,
                        expanded.get()
                    );
                }
                Err(PathError::NotFound {
                    explored: expanded.get(),
                })
            }
        }
    }
}
