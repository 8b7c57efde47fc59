use serde::{Deserialize, Serialize};

/// Block materials known to the generation core.
///
/// This is intentionally a closed set: the generator only ever needs to
/// classify blocks (ground / fluid / vegetation / man-made), so host block
/// registries are mapped onto these variants at the world-provider boundary.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BlockMaterial {
    Air,
    Grass,
    Dirt,
    CoarseDirt,
    Podzol,
    DirtPath,
    Stone,
    Granite,
    Diorite,
    Andesite,
    Sand,
    RedSand,
    Gravel,
    Clay,
    Snow,
    SnowBlock,
    Ice,
    PackedIce,
    Sandstone,
    RedSandstone,
    Water,
    Lava,
    OakLog,
    OakPlanks,
    OakLeaves,
    TallGrass,
    Fern,
    Flower,
    DeadBush,
    Cobblestone,
    StoneBricks,
    Bricks,
    Glass,
    CobblestoneStairs,
    StoneBrickStairs,
    CobblestoneSlab,
    StoneBrickSlab,
    OakDoor,
    Torch,
    CraftingTable,
    Chest,
    Farmland,
    Bedrock,
    CoalOre,
    IronOre,
}

impl BlockMaterial {
    #[inline]
    pub fn is_air(self) -> bool {
        self == BlockMaterial::Air
    }

    #[inline]
    pub fn is_fluid(self) -> bool {
        matches!(self, BlockMaterial::Water | BlockMaterial::Lava)
    }

    /// Thin plant cover that terraforming trims and placement treats as air.
    #[inline]
    pub fn is_vegetation(self) -> bool {
        matches!(
            self,
            BlockMaterial::TallGrass
                | BlockMaterial::Fern
                | BlockMaterial::Flower
                | BlockMaterial::DeadBush
        )
    }

    /// Blocks a structure may be placed into without mining anything out.
    #[inline]
    pub fn is_replaceable(self) -> bool {
        self.is_air() || self.is_vegetation()
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        !matches!(self, BlockMaterial::Torch) && !self.is_air() && !self.is_fluid() && !self.is_vegetation()
    }

    /// The natural-ground whitelist: materials a foundation or a path may
    /// rest on. Snow and ice variants are included so arctic terrain is
    /// buildable; hosts can extend the set via configuration.
    #[inline]
    pub fn is_natural_ground(self) -> bool {
        matches!(
            self,
            BlockMaterial::Grass
                | BlockMaterial::Dirt
                | BlockMaterial::CoarseDirt
                | BlockMaterial::Podzol
                | BlockMaterial::Stone
                | BlockMaterial::Granite
                | BlockMaterial::Diorite
                | BlockMaterial::Andesite
                | BlockMaterial::Sand
                | BlockMaterial::RedSand
                | BlockMaterial::Gravel
                | BlockMaterial::Clay
                | BlockMaterial::Snow
                | BlockMaterial::SnowBlock
                | BlockMaterial::Ice
                | BlockMaterial::PackedIce
                | BlockMaterial::Sandstone
                | BlockMaterial::RedSandstone
        )
    }

    /// Natural terrain for path-cost purposes: the ground whitelist plus
    /// trees and plant cover, which cost little to cross.
    #[inline]
    pub fn is_natural_terrain(self) -> bool {
        self.is_natural_ground()
            || self.is_vegetation()
            || matches!(self, BlockMaterial::OakLog | BlockMaterial::OakLeaves)
    }

    /// Placed building materials and other blocks the planner must treat as
    /// walls: routing through or on top of these is never allowed.
    #[inline]
    pub fn is_obstruction(self) -> bool {
        matches!(
            self,
            BlockMaterial::Bedrock | BlockMaterial::CoalOre | BlockMaterial::IronOre
        ) || self.is_man_made()
    }

    #[inline]
    pub fn is_man_made(self) -> bool {
        matches!(
            self,
            BlockMaterial::DirtPath
                | BlockMaterial::OakPlanks
                | BlockMaterial::Cobblestone
                | BlockMaterial::StoneBricks
                | BlockMaterial::Bricks
                | BlockMaterial::Glass
                | BlockMaterial::CobblestoneStairs
                | BlockMaterial::StoneBrickStairs
                | BlockMaterial::CobblestoneSlab
                | BlockMaterial::StoneBrickSlab
                | BlockMaterial::OakDoor
                | BlockMaterial::Torch
                | BlockMaterial::CraftingTable
                | BlockMaterial::Chest
                | BlockMaterial::Farmland
        )
    }

    /// Materials the path emitter lays down. A path block is valid support
    /// for another path block even though it is man-made.
    #[inline]
    pub fn is_path_material(self) -> bool {
        matches!(
            self,
            BlockMaterial::DirtPath
                | BlockMaterial::Cobblestone
                | BlockMaterial::CobblestoneStairs
                | BlockMaterial::StoneBrickStairs
                | BlockMaterial::CobblestoneSlab
                | BlockMaterial::StoneBrickSlab
        )
    }

    /// Tree parts and plant cover that terraforming clears from a site.
    #[inline]
    pub fn is_clearable(self) -> bool {
        self.is_vegetation() || matches!(self, BlockMaterial::OakLog | BlockMaterial::OakLeaves)
    }
}

/// Horizontal facing for oriented blocks (stairs, doors) and entrances.
/// `+x` is east, `+z` is south.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Facing {
    North,
    East,
    South,
    West,
}

impl Facing {
    pub fn unit(self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::East => (1, 0),
            Facing::South => (0, 1),
            Facing::West => (-1, 0),
        }
    }

    /// Dominant facing for a step delta. Ties prefer the x axis.
    pub fn from_delta(dx: i32, dz: i32) -> Facing {
        if dx.abs() >= dz.abs() {
            if dx >= 0 {
                Facing::East
            } else {
                Facing::West
            }
        } else if dz >= 0 {
            Facing::South
        } else {
            Facing::North
        }
    }

    /// Rotate clockwise (viewed from above) by the given number of 90-degree
    /// quarter turns.
    pub fn rotated(self, quarter_turns: u8) -> Facing {
        let order = [Facing::North, Facing::East, Facing::South, Facing::West];
        let idx = order.iter().position(|f| *f == self).unwrap_or(0);
        order[(idx + quarter_turns as usize) % 4]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_whitelist_excludes_building_materials() {
        assert!(BlockMaterial::Grass.is_natural_ground());
        assert!(BlockMaterial::PackedIce.is_natural_ground());
        assert!(!BlockMaterial::OakPlanks.is_natural_ground());
        assert!(!BlockMaterial::Cobblestone.is_natural_ground());
        assert!(!BlockMaterial::Water.is_natural_ground());
    }

    #[test]
    fn obstructions_cover_placed_building_blocks() {
        assert!(BlockMaterial::Bedrock.is_obstruction());
        assert!(BlockMaterial::OakPlanks.is_obstruction());
        assert!(!BlockMaterial::Stone.is_obstruction());
    }

    #[test]
    fn facing_rotation_cycles_clockwise() {
        assert_eq!(Facing::North.rotated(1), Facing::East);
        assert_eq!(Facing::North.rotated(2), Facing::South);
        assert_eq!(Facing::West.rotated(1), Facing::North);
        assert_eq!(Facing::South.rotated(4), Facing::South);
    }

    #[test]
    fn delta_facing_prefers_dominant_axis() {
        assert_eq!(Facing::from_delta(1, 0), Facing::East);
        assert_eq!(Facing::from_delta(0, -3), Facing::North);
        assert_eq!(Facing::from_delta(-2, 1), Facing::West);
    }
}
