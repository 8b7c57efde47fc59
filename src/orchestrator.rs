use crate::catalog::StructureCatalog;
use crate::commit::CancelToken;
use crate::config::GeneratorConfig;
use crate::constants::SEARCH_RING_STEP;
use crate::error::{AttemptError, VillageError};
use crate::geom::{ring_scan_offsets, BlockPos};
use crate::mask::{any_mask_contains, VolumeMask};
use crate::pathemit::PathEmitter;
use crate::pathplan::{path_hash, PathPlanner};
use crate::placer::StructurePlacer;
use crate::store::VillageStore;
use crate::surface::SurfaceSolver;
use crate::village::{Building, PathNetwork, PathSegment, Village, VillageBorder};
use crate::world::WorldProvider;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

fn draw_uuid(rng: &mut ChaCha8Rng) -> Uuid {
    let hi = rng.next_u64() as u128;
    let lo = rng.next_u64() as u128;
    Uuid::from_u128((hi << 64) | lo)
}

/// Orchestrates one whole village: spacing gate, per-structure candidate
/// search and placement, border upkeep, then path routing and emission
/// against the final mask set.
pub struct Placer<'a> {
    store: &'a VillageStore,
    catalog: &'a StructureCatalog,
    config: &'a GeneratorConfig,
}

impl<'a> Placer<'a> {
    pub fn new(
        store: &'a VillageStore,
        catalog: &'a StructureCatalog,
        config: &'a GeneratorConfig,
    ) -> Placer<'a> {
        Placer {
            store,
            catalog,
            config,
        }
    }

    pub fn place_village(
        &self,
        world: &mut dyn WorldProvider,
        origin: BlockPos,
        culture_id: &str,
        seed: u64,
        cancel: &CancelToken,
    ) -> Result<Village, VillageError> {
        let culture = self
            .catalog
            .culture(culture_id)
            .ok_or_else(|| VillageError::UnknownCulture(culture_id.to_string()))?
            .clone();
        let Some(main_id) = culture.main_building().map(str::to_string) else {
            return Err(VillageError::NoSite);
        };

        let started = std::time::Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let village_id = draw_uuid(&mut rng);

        // Main building first, the rest in seeded shuffle order.
        let mut others: Vec<String> = culture
            .structures
            .iter()
            .filter(|s| **s != main_id)
            .cloned()
            .collect();
        others.shuffle(&mut rng);
        let mut ordered = vec![main_id.clone()];
        ordered.extend(others);

        self.spacing_gate(world.name(), origin)?;

        // Register after the gate so the new village never tests against
        // itself.
        self.store
            .register_village(Village::new(village_id, culture_id, world.name(), origin, seed));

        let mut masks: Vec<VolumeMask> = Vec::new();
        let placer = StructurePlacer::new(self.config);

        for (index, structure_id) in ordered.iter().enumerate() {
            if cancel.is_cancelled() {
                if index == 0 {
                    self.store.remove_village(village_id);
                    return Err(VillageError::Cancelled);
                }
                warn!(
                    "[STRUCT] generation cancelled after {} structures; keeping partial village {}",
                    index, village_id
                );
                break;
            }

            let building_seed = seed.wrapping_add(index as u64);
            let template = self.catalog.get_template(structure_id);

            let Some(candidate) = self.find_candidate(&*world, &masks, origin, structure_id) else {
                warn!(
                    "[STRUCT] no candidate origin for '{}' within radius {} of ({},{})",
                    structure_id, self.config.village_search_radius, origin.x, origin.z
                );
                if index == 0 {
                    self.store.remove_village(village_id);
                    return Err(VillageError::MainBuildingMissing {
                        structure_id: main_id,
                        terrain: true,
                    });
                }
                continue;
            };

            match placer.place(world, &template, candidate, building_seed, village_id, &masks, cancel) {
                Ok(outcome) => {
                    if outcome.orphaned_site {
                        self.store.mark_partially_committed(village_id);
                    }
                    debug!(
                        "[STRUCT][VOLUME] mask {} of {} at ({},{},{})..({},{},{})",
                        masks.len() + 1,
                        village_id,
                        outcome.mask.bounds.min.x,
                        outcome.mask.bounds.min.y,
                        outcome.mask.bounds.min.z,
                        outcome.mask.bounds.max.x,
                        outcome.mask.bounds.max.y,
                        outcome.mask.bounds.max.z
                    );
                    let receipt = &outcome.receipt;
                    let building = Building {
                        building_id: draw_uuid(&mut rng),
                        village_id,
                        structure_id: structure_id.clone(),
                        origin: receipt.origin,
                        effective_width: receipt.effective_width,
                        effective_depth: receipt.effective_depth,
                        rotation: receipt.rotation,
                        bounds: receipt.bounds,
                    };
                    self.store.add_receipt(village_id, outcome.receipt.clone());
                    self.store.add_mask(village_id, outcome.mask.clone());
                    self.store.add_building(village_id, building);
                    masks.push(outcome.mask);
                }
                Err(failure) => {
                    warn!(
                        "[STRUCT] '{}' exhausted {} attempts: {}",
                        structure_id, failure.attempts, failure.last
                    );
                    if failure.orphaned_site
                        || matches!(failure.last, AttemptError::CommitCritical { .. })
                    {
                        self.store.mark_partially_committed(village_id);
                    }
                    if index == 0 {
                        self.store.remove_village(village_id);
                        return Err(VillageError::MainBuildingMissing {
                            structure_id: main_id,
                            terrain: failure.terrain_only,
                        });
                    }
                }
            }
        }

        let Some(current) = self.store.get_village(village_id) else {
            return Err(VillageError::NoSite);
        };
        if current.buildings.is_empty() {
            self.store.remove_village(village_id);
            return Err(VillageError::NoSite);
        }

        // Designate the main building by cross-referencing the culture.
        let main_building_id = current
            .buildings
            .iter()
            .find(|b| b.structure_id == main_id)
            .map(|b| b.building_id);
        let Some(main_building_id) = main_building_id else {
            self.store.remove_village(village_id);
            return Err(VillageError::MainBuildingMissing {
                structure_id: main_id,
                terrain: false,
            });
        };
        self.store.set_main_building(village_id, main_building_id);

        if current.buildings.len() >= 2 {
            self.build_path_network(world, &current, main_building_id, &masks);
        }

        let village = self
            .store
            .get_village(village_id)
            .ok_or(VillageError::NoSite)?;
        info!(
            "[STRUCT] village {} complete: {} buildings, {} path segments",
            village_id,
            village.buildings.len(),
            village.path_network.segments.len()
        );
        if self.config.debug_performance {
            debug!("[STRUCT] village {} generated in {:?}", village_id, started.elapsed());
        }
        Ok(village)
    }

    /// Inter-village spacing gate: Manhattan border-to-border distance to
    /// every existing village in the same world.
    fn spacing_gate(&self, world_name: &str, origin: BlockPos) -> Result<(), VillageError> {
        if self.config.min_village_spacing <= 0 {
            return Ok(());
        }
        let proposed = VillageBorder::point(origin.x, origin.z);
        let mut violation: Option<(i32, Uuid)> = None;
        for existing in self.store.villages_in_world(world_name) {
            let distance = proposed.manhattan_distance_to(&existing.border);
            if distance < self.config.min_village_spacing
                && violation.map(|(d, _)| distance < d).unwrap_or(true)
            {
                violation = Some((distance, existing.village_id));
            }
        }
        match violation {
            Some((actual, nearest)) => {
                warn!(
                    "[STRUCT] spacing violation at ({},{}): {} < {} from village {}",
                    origin.x, origin.z, actual, self.config.min_village_spacing, nearest
                );
                Err(VillageError::SpacingViolation {
                    actual,
                    required: self.config.min_village_spacing,
                    nearest,
                })
            }
            None => Ok(()),
        }
    }

    /// Ring-scan for a candidate origin: walkable ground, conservatively
    /// clear of every existing mask under the worst-case rotation
    /// footprint. Ring order breaks distance ties deterministically.
    fn find_candidate(
        &self,
        world: &dyn WorldProvider,
        masks: &[VolumeMask],
        origin: BlockPos,
        structure_id: &str,
    ) -> Option<BlockPos> {
        let (w, _, d) = self.catalog.get_dimensions(structure_id);
        let clearance = w.max(d) + self.config.min_building_spacing;
        let solver =
            SurfaceSolver::with_extra_ground(world, masks, &self.config.natural_ground_extra);

        for (dx, dz) in ring_scan_offsets(self.config.village_search_radius, SEARCH_RING_STEP) {
            let x = origin.x + dx;
            let z = origin.z + dz;
            let blocked = masks.iter().any(|m| {
                x >= m.bounds.min.x - clearance
                    && x <= m.bounds.max.x + clearance
                    && z >= m.bounds.min.z - clearance
                    && z <= m.bounds.max.z + clearance
            });
            if blocked {
                continue;
            }
            if let Some(y) = solver.walk_level(x, z) {
                return Some(BlockPos::new(x, y, z));
            }
        }
        None
    }

    /// Route every non-main entrance to the main entrance, then emit the
    /// network with the final mask set.
    fn build_path_network(
        &self,
        world: &mut dyn WorldProvider,
        village: &Village,
        main_building_id: Uuid,
        masks: &[VolumeMask],
    ) {
        let main_entrance = village
            .buildings
            .iter()
            .find(|b| b.building_id == main_building_id)
            .and_then(|b| b.receipt(&village.placement_receipts))
            .map(|r| r.entrance);
        let Some(main_entrance) = main_entrance else {
            warn!("[PATH] main building has no receipt; skipping path network");
            return;
        };

        let mut network = PathNetwork::default();
        let mut attempted = 0u32;
        for building in &village.buildings {
            if building.building_id == main_building_id {
                continue;
            }
            let Some(receipt) = building.receipt(&village.placement_receipts) else {
                continue;
            };
            attempted += 1;
            let planner = PathPlanner::new(&*world, masks, self.config);
            match planner.plan(receipt.entrance, main_entrance) {
                Ok(planned) => {
                    // An entrance projected before later buildings existed
                    // can sit inside a newer mask; trim such boundary
                    // nodes so the stored route is mask-disjoint.
                    let mut blocks = planned.nodes;
                    while blocks
                        .first()
                        .is_some_and(|n| any_mask_contains(masks, n.x, n.y, n.z))
                    {
                        blocks.remove(0);
                    }
                    while blocks
                        .last()
                        .is_some_and(|n| any_mask_contains(masks, n.x, n.y, n.z))
                    {
                        blocks.pop();
                    }
                    let hash = path_hash(&blocks);
                    network.segments.push(PathSegment {
                        from: receipt.entrance,
                        to: main_entrance,
                        blocks,
                        hash,
                    });
                }
                Err(err) => {
                    warn!(
                        "[PATH] '{}' -> main failed: {}",
                        building.structure_id, err
                    );
                }
            }
        }

        let emitter = PathEmitter::new(
            crate::catalog::PathPalette::for_culture(&village.culture_id),
            masks,
            self.config,
        );
        for segment in &network.segments {
            emitter.emit(world, &segment.blocks);
        }

        let connectivity = if attempted == 0 {
            1.0
        } else {
            network.segments.len() as f32 / attempted as f32
        };
        if connectivity < 1.0 {
            warn!(
                "[PATH] village {} connectivity {:.2} ({} of {} paths routed)",
                village.village_id,
                connectivity,
                network.segments.len(),
                attempted
            );
        }
        self.store
            .set_path_network(village.village_id, network, connectivity);
    }
}
