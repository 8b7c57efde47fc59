use crate::commit::{CancelToken, CommitQueue, QueuedBlock};
use crate::catalog::StructureTemplate;
use crate::config::GeneratorConfig;
use crate::constants::*;
use crate::error::{AttemptError, SiteRejection};
use crate::geom::{effective_dims, rotated_bounds, Aabb, BlockPos, Rotation};
use crate::mask::{collides_with_masks, VolumeMask};
use crate::receipt::{Corner, CornerSample, PlacementReceipt};
use crate::surface::SurfaceSolver;
use crate::terraform::Terraformer;
use crate::validator::SiteValidator;
use crate::village::epoch_seconds;
use crate::world::WorldProvider;
use log::{debug, error, info};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

/// Result of a successful commit: the ground-truth receipt and the mask
/// derived from it.
#[derive(Clone, Debug)]
pub struct PlacementOutcome {
    pub receipt: PlacementReceipt,
    pub mask: VolumeMask,
    /// An earlier attempt left an orphaned site (commit failed after
    /// terraforming). The village must be flagged partially committed.
    pub orphaned_site: bool,
}

/// All re-seat attempts failed.
#[derive(Clone, Debug)]
pub struct PlaceFailure {
    pub attempts: u32,
    pub last: AttemptError,
    /// Every attempt failed on terrain (fluid, steepness, missing
    /// ground) rather than collisions or commit errors.
    pub terrain_only: bool,
    /// Some attempt left an orphaned site behind.
    pub orphaned_site: bool,
}

fn is_terrain_error(err: &AttemptError) -> bool {
    matches!(
        err,
        AttemptError::SiteRejected(SiteRejection::Fluid)
            | AttemptError::SiteRejected(SiteRejection::Steep)
            | AttemptError::TerraformingAborted { .. }
            | AttemptError::NoGround { .. }
    )
}

/// Places one structure: validate, collide, terraform, commit, sample the
/// foundation, compute the entrance, build the receipt. On rejection the
/// site is re-seated at a seeded nearby offset, at most
/// `worldgen.maxReseatAttempts` times.
pub struct StructurePlacer<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> StructurePlacer<'a> {
    pub fn new(config: &'a GeneratorConfig) -> StructurePlacer<'a> {
        StructurePlacer { config }
    }

    pub fn place(
        &self,
        world: &mut dyn WorldProvider,
        template: &StructureTemplate,
        origin: BlockPos,
        seed: u64,
        village_id: Uuid,
        existing_masks: &[VolumeMask],
        cancel: &CancelToken,
    ) -> Result<PlacementOutcome, PlaceFailure> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // Draw order is fixed: rotation first, then each re-seat offset
        // consumes subsequent draws. Changing this changes every world.
        let rotation = Rotation::from_quarter_turns((rng.next_u32() % 4) as u8);
        let (w, h, d) = template.dimensions();

        let mut last = AttemptError::NoGround {
            x: origin.x,
            z: origin.z,
        };
        let mut terrain_only = true;
        let mut orphaned_site = false;

        for attempt in 0..self.config.max_reseat_attempts {
            let candidate = if attempt == 0 {
                Some(origin)
            } else {
                self.next_alternative(world, existing_masks, origin, &mut rng, attempt)
            };
            let Some(candidate) = candidate else {
                last = AttemptError::NoGround {
                    x: origin.x,
                    z: origin.z,
                };
                continue;
            };

            if candidate.y <= world.min_height() {
                last = AttemptError::NoGround {
                    x: candidate.x,
                    z: candidate.z,
                };
                continue;
            }

            let bounds = rotated_bounds(candidate, w, h, d, rotation);
            match self.try_site(world, template, candidate, &bounds, rotation, village_id, existing_masks, cancel) {
                Ok(mut outcome) => {
                    outcome.orphaned_site = orphaned_site;
                    info!("{}", outcome.receipt.summary());
                    return Ok(outcome);
                }
                Err(err) => {
                    if self.config.debug_structures {
                        debug!(
                            "[STRUCT] attempt {}/{} for '{}' at ({},{},{}) failed: {}",
                            attempt + 1,
                            self.config.max_reseat_attempts,
                            template.structure_id,
                            candidate.x,
                            candidate.y,
                            candidate.z,
                            err
                        );
                    }
                    if matches!(err, AttemptError::CommitCritical { .. }) {
                        orphaned_site = true;
                        error!(
                            "[STRUCT] orphaned site for '{}' at ({},{},{}): {}",
                            template.structure_id, candidate.x, candidate.y, candidate.z, err
                        );
                    }
                    terrain_only &= is_terrain_error(&err);
                    last = err;
                }
            }
        }

        Err(PlaceFailure {
            attempts: self.config.max_reseat_attempts,
            last,
            terrain_only,
            orphaned_site,
        })
    }

    /// A seeded offset in a spiral of growing radius, re-projected onto
    /// walkable ground.
    fn next_alternative(
        &self,
        world: &dyn WorldProvider,
        masks: &[VolumeMask],
        origin: BlockPos,
        rng: &mut ChaCha8Rng,
        attempt: u32,
    ) -> Option<BlockPos> {
        let radius = (attempt as i32 * RESEAT_RADIUS_STEP).min(self.config.max_reseat_radius);
        let dx = rng.random_range(-radius..=radius);
        let dz = rng.random_range(-radius..=radius);
        let x = origin.x + dx;
        let z = origin.z + dz;
        let solver = SurfaceSolver::with_extra_ground(world, masks, &self.config.natural_ground_extra);
        solver.walk_level(x, z).map(|y| BlockPos::new(x, y, z))
    }

    #[allow(clippy::too_many_arguments)]
    fn try_site(
        &self,
        world: &mut dyn WorldProvider,
        template: &StructureTemplate,
        candidate: BlockPos,
        bounds: &Aabb,
        rotation: Rotation,
        village_id: Uuid,
        existing_masks: &[VolumeMask],
        cancel: &CancelToken,
    ) -> Result<PlacementOutcome, AttemptError> {
        let result = SiteValidator::with_extra_ground(&*world, &self.config.natural_ground_extra)
            .validate(bounds);
        if !result.passed {
            let rejection = if result.counts.fluid > 0 {
                SiteRejection::Fluid
            } else if !result.foundation_ok {
                if result.counts.steep >= result.counts.blocked {
                    SiteRejection::Steep
                } else {
                    SiteRejection::Blocked
                }
            } else if !result.interior_air_ok {
                SiteRejection::Interior
            } else {
                SiteRejection::Entrance
            };
            return Err(AttemptError::SiteRejected(rejection));
        }

        if collides_with_masks(bounds, self.config.min_building_spacing, existing_masks) {
            return Err(AttemptError::Collision);
        }

        let terraformer = Terraformer {
            backfill_ring: self.config.aggressive_backfill,
            log_changes: self.config.debug_terraforming,
        };
        terraformer.prepare(world, bounds)?;

        // Point of no return: the site is prepared. A failed commit is
        // never retried here; the site is orphaned and the loop moves on.
        let blocks = materialize(template, bounds, rotation);
        let block_count = blocks.len();
        let mut queue = CommitQueue::new(self.config.commit_batch_size);
        queue.enqueue(blocks);
        if !queue.run_to_completion(world, cancel) {
            return Err(AttemptError::CommitCritical {
                reason: format!("cancelled with {} of {} blocks pending", queue.remaining(), block_count),
            });
        }

        let timestamp = epoch_seconds();
        let foundation_corners = sample_corners(&*world, bounds);
        let mask = VolumeMask::solid(template.structure_id.clone(), village_id, *bounds, timestamp);
        let entrance = compute_entrance(&*world, template, bounds, rotation, &mask, self.config);

        let (ew, ed) = effective_dims(template.width, template.depth, rotation);
        let receipt = PlacementReceipt {
            structure_id: template.structure_id.clone(),
            village_id,
            bounds: *bounds,
            origin: candidate,
            rotation,
            effective_width: ew,
            effective_depth: ed,
            height: template.height,
            foundation_corners,
            entrance,
            timestamp,
        };
        debug_assert!(receipt.is_well_formed());

        Ok(PlacementOutcome {
            receipt,
            mask,
            orphaned_site: false,
        })
    }
}

/// Rotate the template cells into world space at the committed bounds.
fn materialize(template: &StructureTemplate, bounds: &Aabb, rotation: Rotation) -> Vec<QueuedBlock> {
    let turns = rotation.quarter_turns();
    template
        .cells()
        .into_iter()
        .map(|cell| {
            let (rx, rz) = rotation.rotate_cell(cell.x, cell.z, template.width, template.depth);
            QueuedBlock {
                pos: BlockPos::new(bounds.min.x + rx, bounds.min.y + cell.y, bounds.min.z + rz),
                material: cell.material,
                facing: cell.facing.map(|f| f.rotated(turns)),
            }
        })
        .collect()
}

/// Sample the four foundation corners at the base level, clockwise from
/// the min-x/min-z corner.
fn sample_corners(world: &dyn WorldProvider, bounds: &Aabb) -> [CornerSample; 4] {
    let y = bounds.min.y;
    let spots = [
        (Corner::NW, bounds.min.x, bounds.min.z),
        (Corner::NE, bounds.max.x, bounds.min.z),
        (Corner::SE, bounds.max.x, bounds.max.z),
        (Corner::SW, bounds.min.x, bounds.max.z),
    ];
    spots.map(|(corner, x, z)| CornerSample {
        corner,
        pos: BlockPos::new(x, y, z),
        material: world.block_at(x, y, z),
    })
}

/// Walk from the rotated entrance anchor outwards along the rotated
/// facing until clear of the bounds plus the projection distance, then
/// seat the point on walkable ground using a solver that masks only this
/// structure.
fn compute_entrance(
    world: &dyn WorldProvider,
    template: &StructureTemplate,
    bounds: &Aabb,
    rotation: Rotation,
    own_mask: &VolumeMask,
    config: &GeneratorConfig,
) -> BlockPos {
    let turns = rotation.quarter_turns();
    let (ax, ay, az) = template.anchor;
    let (rx, rz) = rotation.rotate_cell(ax, az, template.width, template.depth);
    let facing = template.facing.rotated(turns);
    let (fx, fz) = facing.unit();

    let mut x = bounds.min.x + rx;
    let mut z = bounds.min.z + rz;
    while bounds.footprint_contains(x, z) {
        x += fx;
        z += fz;
    }
    x += fx * (ENTRANCE_PROJECTION - 1);
    z += fz * (ENTRANCE_PROJECTION - 1);

    let masks = std::slice::from_ref(own_mask);
    let solver = SurfaceSolver::with_extra_ground(world, masks, &config.natural_ground_extra);
    let y = solver
        .walk_level(x, z)
        .unwrap_or(bounds.min.y + ay.max(0) + 1);
    BlockPos::new(x, y, z)
}
