use crate::block::BlockMaterial;
use crate::constants::*;
use crate::error::StoreError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::Path;

bitflags! {
    /// Debug logging channels.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DebugFlags: u8 {
        const STRUCTURES = 1;
        const PATHS = 2;
        const TERRAFORMING = 4;
        const PERFORMANCE = 8;
    }
}

/// Generator configuration. The serialized keys are the host-facing
/// dotted names; every field has the documented default so an empty file
/// (or no file) yields a fully working config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Buffer around each building mask for intra-village spacing checks.
    #[serde(rename = "village.minBuildingSpacing", default = "d_building_spacing")]
    pub min_building_spacing: i32,

    /// Manhattan border-to-border minimum between villages per world.
    #[serde(rename = "village.minVillageSpacing", default = "d_village_spacing")]
    pub min_village_spacing: i32,

    #[serde(rename = "worldgen.maxReseatAttempts", default = "d_reseat_attempts")]
    pub max_reseat_attempts: u32,

    /// Radius cap for re-seat offsets.
    #[serde(rename = "worldgen.maxSearchRadius", default = "d_reseat_radius")]
    pub max_reseat_radius: i32,

    /// Ring-scan radius for the orchestrator's candidate search.
    #[serde(rename = "worldgen.villageSearchRadius", default = "d_village_radius")]
    pub village_search_radius: i32,

    #[serde(rename = "pathfinding.maxNodes", default = "d_path_nodes")]
    pub path_max_nodes: usize,

    #[serde(rename = "pathfinding.maxDistance", default = "d_path_distance")]
    pub path_max_distance: i32,

    #[serde(rename = "pathfinding.maxSlope", default = "d_path_slope")]
    pub path_max_slope: i32,

    #[serde(rename = "commit.batchSize", default = "d_batch_size")]
    pub commit_batch_size: usize,

    #[serde(rename = "debug.structures", default)]
    pub debug_structures: bool,

    #[serde(rename = "debug.paths", default)]
    pub debug_paths: bool,

    #[serde(rename = "debug.terraforming", default)]
    pub debug_terraforming: bool,

    #[serde(rename = "debug.performance", default)]
    pub debug_performance: bool,

    /// Additional materials accepted as natural ground (arctic packs and
    /// other exotic terrain).
    #[serde(rename = "terrain.naturalGroundExtra", default)]
    pub natural_ground_extra: Vec<BlockMaterial>,

    /// Backfill the one-tile ring under overhang terrain. Never inferred.
    #[serde(rename = "terraforming.aggressiveBackfill", default)]
    pub aggressive_backfill: bool,
}

fn d_building_spacing() -> i32 {
    DEFAULT_MIN_BUILDING_SPACING
}
fn d_village_spacing() -> i32 {
    DEFAULT_MIN_VILLAGE_SPACING
}
fn d_reseat_attempts() -> u32 {
    DEFAULT_MAX_RESEAT_ATTEMPTS
}
fn d_reseat_radius() -> i32 {
    DEFAULT_MAX_RESEAT_RADIUS
}
fn d_village_radius() -> i32 {
    DEFAULT_MAX_SEARCH_RADIUS
}
fn d_path_nodes() -> usize {
    DEFAULT_MAX_NODES_EXPLORED
}
fn d_path_distance() -> i32 {
    DEFAULT_MAX_SEARCH_DISTANCE
}
fn d_path_slope() -> i32 {
    DEFAULT_MAX_SLOPE
}
fn d_batch_size() -> usize {
    DEFAULT_COMMIT_BATCH_SIZE
}

impl Default for GeneratorConfig {
    fn default() -> GeneratorConfig {
        GeneratorConfig {
            min_building_spacing: d_building_spacing(),
            min_village_spacing: d_village_spacing(),
            max_reseat_attempts: d_reseat_attempts(),
            max_reseat_radius: d_reseat_radius(),
            village_search_radius: d_village_radius(),
            path_max_nodes: d_path_nodes(),
            path_max_distance: d_path_distance(),
            path_max_slope: d_path_slope(),
            commit_batch_size: d_batch_size(),
            debug_structures: false,
            debug_paths: false,
            debug_terraforming: false,
            debug_performance: false,
            natural_ground_extra: Vec::new(),
            aggressive_backfill: false,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<GeneratorConfig, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn debug_flags(&self) -> DebugFlags {
        let mut flags = DebugFlags::empty();
        flags.set(DebugFlags::STRUCTURES, self.debug_structures);
        flags.set(DebugFlags::PATHS, self.debug_paths);
        flags.set(DebugFlags::TERRAFORMING, self.debug_terraforming);
        flags.set(DebugFlags::PERFORMANCE, self.debug_performance);
        flags
    }
}
