use thiserror::Error;
use uuid::Uuid;

/// Which site check failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum SiteRejection {
    #[error("fluid")]
    Fluid,
    #[error("steep")]
    Steep,
    #[error("blocked")]
    Blocked,
    #[error("interior")]
    Interior,
    #[error("entrance")]
    Entrance,
}

/// Failures local to one re-seat attempt. These are recovered inside the
/// placement loop and only surface if every attempt exhausts.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AttemptError {
    #[error("site rejected: {0}")]
    SiteRejected(SiteRejection),

    #[error("no walkable ground at candidate ({x}, {z})")]
    NoGround { x: i32, z: i32 },

    #[error("candidate bounds collide with an existing mask")]
    Collision,

    #[error("terraforming aborted: fluid at ({x}, {z})")]
    TerraformingAborted { x: i32, z: i32 },

    /// The paste failed after terraforming already modified the world.
    /// Never retried on the same site; the site is orphaned.
    #[error("commit failed after terraforming: {reason}")]
    CommitCritical { reason: String },
}

/// Failures surfaced from `place_village`.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum VillageError {
    #[error("village spacing violated: {actual} < {required} (nearest village {nearest})")]
    SpacingViolation {
        actual: i32,
        required: i32,
        nearest: Uuid,
    },

    #[error("main building '{structure_id}' could not be placed")]
    MainBuildingMissing {
        structure_id: String,
        /// True when every attempt failed on terrain (fluid/steep), as
        /// opposed to collisions or commit errors.
        terrain: bool,
    },

    #[error("no structure could be placed at the proposed site")]
    NoSite,

    #[error("unknown culture '{0}'")]
    UnknownCulture(String),

    #[error("generation cancelled")]
    Cancelled,
}

/// Path planning failures. A failed pair is skipped; other paths are
/// still attempted.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PathError {
    #[error("endpoints out of range: distance {distance} not in [{min}, {max}]")]
    OutOfRange { distance: i32, min: i32, max: i32 },

    #[error("no path found after {explored} node expansions")]
    NotFound { explored: usize },
}

/// Store persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
