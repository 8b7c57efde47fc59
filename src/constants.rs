//! Tuning defaults shared by the configuration layer and the components.

/// Buffer around each building mask for intra-village spacing checks.
pub const DEFAULT_MIN_BUILDING_SPACING: i32 = 2;

/// Manhattan border-to-border minimum between villages in the same world.
pub const DEFAULT_MIN_VILLAGE_SPACING: i32 = 200;

pub const DEFAULT_MAX_RESEAT_ATTEMPTS: u32 = 3;

/// Radius growth per re-seat attempt, and its cap.
pub const RESEAT_RADIUS_STEP: i32 = 8;
pub const DEFAULT_MAX_RESEAT_RADIUS: i32 = 32;

/// Orchestrator candidate search: ring scan out to this radius.
pub const DEFAULT_MAX_SEARCH_RADIUS: i32 = 100;
pub const SEARCH_RING_STEP: i32 = 8;

pub const DEFAULT_MAX_NODES_EXPLORED: usize = 5000;
pub const DEFAULT_MAX_SEARCH_DISTANCE: i32 = 200;
/// Start and end closer than this are not worth a path.
pub const MIN_SEARCH_DISTANCE: i32 = 3;
pub const DEFAULT_MAX_SLOPE: i32 = 3;

pub const DEFAULT_COMMIT_BATCH_SIZE: usize = 50;

/// Entrance points are projected this far beyond the structure bounds so
/// they clear the standard mask buffer.
pub const ENTRANCE_PROJECTION: i32 = 3;

/// A foundation tile whose ground level deviates from the base plane by
/// more than this is classified steep.
pub const STEEP_DELTA: i32 = 2;

/// Minimum fraction of plain solid tiles for a foundation to pass.
pub const FOUNDATION_SOLID_FRACTION: f32 = 0.7;

/// Minimum fraction of replaceable cells in the placement volume.
pub const INTERIOR_AIR_FRACTION: f32 = 0.6;

// Path planner step costs, on a x10 integer scale so the pathfinding
// queue orders exactly (flat step = 1.0 in the spec's terms).
pub const PATH_COST_FLAT: u32 = 10;
pub const PATH_COST_WATER: u32 = 100;
pub const PATH_COST_UNKNOWN_SOLID: u32 = 20;
/// Added per block of rise.
pub const PATH_COST_SLOPE_PER_BLOCK: u32 = 20;
/// Steps at or above this cost are impassable and never expanded.
pub const PATH_OBSTACLE_COST: u32 = 200;

/// The goal is reached within this tolerance on both x and z.
pub const PATH_GOAL_TOLERANCE: i32 = 2;

/// Air clearance maintained above emitted path blocks.
pub const PATH_CLEARANCE_HEIGHT: i32 = 2;

/// A slab accents every Nth tile of a flat path run.
pub const PATH_SLAB_INTERVAL: usize = 5;

/// Persistence schema version stamped on every village record.
pub const SCHEMA_VERSION: u32 = 1;
