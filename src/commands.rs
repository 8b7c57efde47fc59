use crate::catalog::StructureCatalog;
use crate::commit::CancelToken;
use crate::config::GeneratorConfig;
use crate::error::VillageError;
use crate::geom::BlockPos;
use crate::orchestrator::Placer;
use crate::store::VillageStore;
use crate::world::WorldProvider;
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host-independent command surface. Hosts parse their own input into
/// these and render the outcome however they like.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Generate {
        culture_id: String,
        origin: BlockPos,
        seed: u64,
    },
    Remove {
        village_id: Uuid,
    },
    Status {
        village_id: Uuid,
    },
    Reload,
}

/// Stable failure reason codes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Spacing,
    Terrain,
    NoSite,
    PlacementFailed,
    Cancelled,
}

impl From<&VillageError> for FailureReason {
    fn from(err: &VillageError) -> FailureReason {
        match err {
            VillageError::SpacingViolation { .. } => FailureReason::Spacing,
            VillageError::MainBuildingMissing { terrain: true, .. } => FailureReason::Terrain,
            VillageError::MainBuildingMissing { .. } => FailureReason::PlacementFailed,
            VillageError::NoSite | VillageError::UnknownCulture(_) => FailureReason::NoSite,
            VillageError::Cancelled => FailureReason::Cancelled,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    Generated { village_id: Uuid },
    Removed { village_id: Uuid },
    Status(String),
    Reloaded,
    Failed { reason: FailureReason, detail: String },
}

/// Execute one command against the store and world.
pub fn dispatch(
    command: Command,
    world: &mut dyn WorldProvider,
    store: &VillageStore,
    catalog: &mut StructureCatalog,
    config: &GeneratorConfig,
    cancel: &CancelToken,
) -> CommandOutcome {
    match command {
        Command::Generate {
            culture_id,
            origin,
            seed,
        } => {
            let placer = Placer::new(store, catalog, config);
            match placer.place_village(world, origin, &culture_id, seed, cancel) {
                Ok(village) => CommandOutcome::Generated {
                    village_id: village.village_id,
                },
                Err(err) => CommandOutcome::Failed {
                    reason: (&err).into(),
                    detail: err.to_string(),
                },
            }
        }
        Command::Remove { village_id } => match store.remove_village(village_id) {
            Some(_) => {
                info!("[STRUCT] removed village {}", village_id);
                CommandOutcome::Removed { village_id }
            }
            None => CommandOutcome::Failed {
                reason: FailureReason::NoSite,
                detail: format!("no village {}", village_id),
            },
        },
        Command::Status { village_id } => match store.get_village(village_id) {
            Some(village) => CommandOutcome::Status(village.status_line()),
            None => CommandOutcome::Failed {
                reason: FailureReason::NoSite,
                detail: format!("no village {}", village_id),
            },
        },
        Command::Reload => match catalog.reload() {
            Ok(()) => CommandOutcome::Reloaded,
            Err(err) => CommandOutcome::Failed {
                reason: FailureReason::NoSite,
                detail: err.to_string(),
            },
        },
    }
}
