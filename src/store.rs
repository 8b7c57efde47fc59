use crate::constants::SCHEMA_VERSION;
use crate::error::StoreError;
use crate::mask::VolumeMask;
use crate::receipt::PlacementReceipt;
use crate::village::{Building, PathNetwork, Village};
use fnv::FnvHashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// On-disk envelope for one village. The village itself is flattened so
/// the file reads as a single record; unknown fields survive a round
/// trip via the village's sidecar map.
#[derive(Serialize, Deserialize)]
struct VillageRecord {
    schema_version: u32,
    #[serde(flatten)]
    village: Village,
}

/// Thread-safe registry of villages. Everything handed out is a
/// defensive copy; entries mutate only through the store's own methods.
#[derive(Default)]
pub struct VillageStore {
    inner: RwLock<FnvHashMap<Uuid, Village>>,
}

impl VillageStore {
    pub fn new() -> VillageStore {
        VillageStore::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, FnvHashMap<Uuid, Village>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FnvHashMap<Uuid, Village>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_village(&self, village: Village) {
        self.write().insert(village.village_id, village);
    }

    /// Append a building and grow the village border around it.
    pub fn add_building(&self, village_id: Uuid, building: Building) {
        if let Some(village) = self.write().get_mut(&village_id) {
            village.border.envelop(&building.bounds);
            village.buildings.push(building);
        }
    }

    pub fn add_receipt(&self, village_id: Uuid, receipt: PlacementReceipt) {
        if let Some(village) = self.write().get_mut(&village_id) {
            village.placement_receipts.push(receipt);
        }
    }

    pub fn add_mask(&self, village_id: Uuid, mask: VolumeMask) {
        if let Some(village) = self.write().get_mut(&village_id) {
            village.volume_masks.push(mask);
        }
    }

    pub fn set_main_building(&self, village_id: Uuid, building_id: Uuid) {
        if let Some(village) = self.write().get_mut(&village_id) {
            village.main_building_id = Some(building_id);
        }
    }

    pub fn set_path_network(&self, village_id: Uuid, network: PathNetwork, connectivity: f32) {
        if let Some(village) = self.write().get_mut(&village_id) {
            village.path_network = network;
            village.connectivity = connectivity;
        }
    }

    pub fn mark_partially_committed(&self, village_id: Uuid) {
        if let Some(village) = self.write().get_mut(&village_id) {
            village.partially_committed = true;
        }
    }

    pub fn get_village(&self, village_id: Uuid) -> Option<Village> {
        self.read().get(&village_id).cloned()
    }

    pub fn villages(&self) -> Vec<Village> {
        self.read().values().cloned().collect()
    }

    pub fn villages_in_world(&self, world_name: &str) -> Vec<Village> {
        self.read()
            .values()
            .filter(|v| v.world_name == world_name)
            .cloned()
            .collect()
    }

    pub fn remove_village(&self, village_id: Uuid) -> Option<Village> {
        self.write().remove(&village_id)
    }

    pub fn clear_all(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Write every village as `<village_id>.json` under `dir`. Returns
    /// the number of files written.
    pub fn save_all(&self, dir: impl AsRef<Path>) -> Result<usize, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let villages = self.villages();
        for village in &villages {
            let record = VillageRecord {
                schema_version: SCHEMA_VERSION,
                village: village.clone(),
            };
            let path = dir.join(format!("{}.json", village.village_id));
            std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
        }
        info!("[STRUCT] saved {} villages to {}", villages.len(), dir.display());
        Ok(villages.len())
    }

    /// Load every `.json` village record under `dir`. Records for worlds
    /// not in `known_worlds` are skipped with a warning; newer schema
    /// versions are skipped rather than misread.
    pub fn load_all(&self, dir: impl AsRef<Path>, known_worlds: &[&str]) -> Result<usize, StoreError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(0);
        }
        let mut loaded = 0usize;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            let record: VillageRecord = match serde_json::from_str(&text) {
                Ok(record) => record,
                Err(err) => {
                    warn!("[STRUCT] skipping unreadable village file {}: {}", path.display(), err);
                    continue;
                }
            };
            if record.schema_version > SCHEMA_VERSION {
                warn!(
                    "[STRUCT] skipping {} with schema version {} (supported: {})",
                    path.display(),
                    record.schema_version,
                    SCHEMA_VERSION
                );
                continue;
            }
            if !known_worlds.contains(&record.village.world_name.as_str()) {
                warn!(
                    "[STRUCT] skipping village {}: world '{}' is not present",
                    record.village.village_id, record.village.world_name
                );
                continue;
            }
            self.register_village(record.village);
            loaded += 1;
        }
        info!("[STRUCT] loaded {} villages from {}", loaded, dir.display());
        Ok(loaded)
    }
}
