use crate::block::{BlockMaterial, Facing};
use fnv::FnvHashMap;

/// The host world as seen by the generation core.
///
/// Implementations must stay consistent for the duration of a single
/// village generation (the core is the only writer).
pub trait WorldProvider {
    /// Identity of the world, used to scope spacing checks and persistence.
    fn name(&self) -> &str;

    fn min_height(&self) -> i32;

    fn max_height(&self) -> i32;

    /// Highest non-air block in the column, or `None` for a void column.
    fn highest_block_y(&self, x: i32, z: i32) -> Option<i32>;

    fn block_at(&self, x: i32, y: i32, z: i32) -> BlockMaterial;

    fn set_block(&mut self, x: i32, y: i32, z: i32, material: BlockMaterial);

    /// Place an oriented block. Hosts without per-block orientation data
    /// may ignore the facing.
    fn set_block_facing(&mut self, x: i32, y: i32, z: i32, material: BlockMaterial, _facing: Facing) {
        self.set_block(x, y, z, material);
    }
}

/// In-memory voxel world: a heightmap with optional per-column surface
/// material and water level, plus a sparse override layer for every block
/// the generator commits. Columns are grass over dirt over stone, bedrock
/// at the floor.
///
/// This is the world the test suite and offline generation run against;
/// hosts adapt their own chunk storage to [`WorldProvider`] instead.
pub struct GridWorld {
    name: String,
    min_y: i32,
    max_y: i32,
    default_ground: i32,
    heights: FnvHashMap<(i32, i32), i32>,
    surfaces: FnvHashMap<(i32, i32), BlockMaterial>,
    water_levels: FnvHashMap<(i32, i32), i32>,
    overrides: FnvHashMap<(i32, i32, i32), BlockMaterial>,
    facings: FnvHashMap<(i32, i32, i32), Facing>,
    /// Highest override per column, to bound the surface scan.
    column_tops: FnvHashMap<(i32, i32), i32>,
}

impl GridWorld {
    /// A flat world with ground (grass) at `ground_y` everywhere.
    pub fn flat(name: impl Into<String>, ground_y: i32) -> GridWorld {
        GridWorld {
            name: name.into(),
            min_y: 0,
            max_y: 255,
            default_ground: ground_y,
            heights: FnvHashMap::default(),
            surfaces: FnvHashMap::default(),
            water_levels: FnvHashMap::default(),
            overrides: FnvHashMap::default(),
            facings: FnvHashMap::default(),
            column_tops: FnvHashMap::default(),
        }
    }

    pub fn ground_height(&self, x: i32, z: i32) -> i32 {
        *self.heights.get(&(x, z)).unwrap_or(&self.default_ground)
    }

    pub fn set_ground_height(&mut self, x: i32, z: i32, y: i32) {
        self.heights.insert((x, z), y.clamp(self.min_y, self.max_y));
    }

    pub fn set_surface_material(&mut self, x: i32, z: i32, material: BlockMaterial) {
        self.surfaces.insert((x, z), material);
    }

    /// Flood the rectangle with water: the ground drops to `floor_y` and
    /// water stands up to `water_y`.
    pub fn flood_rect(&mut self, min_x: i32, min_z: i32, max_x: i32, max_z: i32, floor_y: i32, water_y: i32) {
        for x in min_x..=max_x {
            for z in min_z..=max_z {
                self.set_ground_height(x, z, floor_y);
                self.surfaces.insert((x, z), BlockMaterial::Sand);
                self.water_levels.insert((x, z), water_y);
            }
        }
    }

    /// Raise a rectangular hill to `top_y` (grass surface).
    pub fn raise_rect(&mut self, min_x: i32, min_z: i32, max_x: i32, max_z: i32, top_y: i32) {
        for x in min_x..=max_x {
            for z in min_z..=max_z {
                self.set_ground_height(x, z, top_y);
            }
        }
    }

    /// Facing recorded for an oriented block, if any.
    pub fn facing_at(&self, x: i32, y: i32, z: i32) -> Option<Facing> {
        self.facings.get(&(x, y, z)).copied()
    }

    fn base_material(&self, x: i32, y: i32, z: i32) -> BlockMaterial {
        if y < self.min_y || y > self.max_y {
            return BlockMaterial::Air;
        }
        if y == self.min_y {
            return BlockMaterial::Bedrock;
        }
        let ground = self.ground_height(x, z);
        if y > ground {
            if let Some(&water) = self.water_levels.get(&(x, z)) {
                if y <= water {
                    return BlockMaterial::Water;
                }
            }
            return BlockMaterial::Air;
        }
        if y == ground {
            return *self.surfaces.get(&(x, z)).unwrap_or(&BlockMaterial::Grass);
        }
        if y >= ground - 3 {
            BlockMaterial::Dirt
        } else {
            BlockMaterial::Stone
        }
    }
}

impl WorldProvider for GridWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_height(&self) -> i32 {
        self.min_y
    }

    fn max_height(&self) -> i32 {
        self.max_y
    }

    fn highest_block_y(&self, x: i32, z: i32) -> Option<i32> {
        let mut top = self.ground_height(x, z);
        if let Some(&water) = self.water_levels.get(&(x, z)) {
            top = top.max(water);
        }
        if let Some(&override_top) = self.column_tops.get(&(x, z)) {
            top = top.max(override_top);
        }
        let mut y = top.min(self.max_y);
        while y >= self.min_y {
            if !self.block_at(x, y, z).is_air() {
                return Some(y);
            }
            y -= 1;
        }
        None
    }

    fn block_at(&self, x: i32, y: i32, z: i32) -> BlockMaterial {
        if let Some(&material) = self.overrides.get(&(x, y, z)) {
            return material;
        }
        self.base_material(x, y, z)
    }

    fn set_block(&mut self, x: i32, y: i32, z: i32, material: BlockMaterial) {
        if y < self.min_y || y > self.max_y {
            return;
        }
        self.overrides.insert((x, y, z), material);
        self.facings.remove(&(x, y, z));
        if !material.is_air() {
            let top = self.column_tops.entry((x, z)).or_insert(y);
            if y > *top {
                *top = y;
            }
        }
    }

    fn set_block_facing(&mut self, x: i32, y: i32, z: i32, material: BlockMaterial, facing: Facing) {
        self.set_block(x, y, z, material);
        self.facings.insert((x, y, z), facing);
    }
}
