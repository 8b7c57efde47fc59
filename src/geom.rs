use serde::{Deserialize, Serialize};

/// A block position on the integer lattice. `+x` is east, `+z` is south,
/// `+y` is up.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos { x, y, z }
    }

    /// Manhattan distance on the ground plane.
    pub fn manhattan_xz(self, other: BlockPos) -> i32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }

    /// Squared Euclidean distance on the ground plane. Kept squared so
    /// callers compare against squared limits without floating point.
    pub fn euclid_sq_xz(self, other: BlockPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

/// Rotation about the vertical axis, clockwise viewed from above.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn from_quarter_turns(turns: u8) -> Rotation {
        match turns % 4 {
            0 => Rotation::None,
            1 => Rotation::Cw90,
            2 => Rotation::Cw180,
            _ => Rotation::Cw270,
        }
    }

    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    pub fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    pub fn from_degrees(deg: u16) -> Option<Rotation> {
        match deg {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }

    /// Rotate a ground-plane vector. With `+x` east and `+z` south a
    /// clockwise quarter turn maps east to south: `(x, z) -> (-z, x)`.
    pub fn rotate_vec(self, x: i32, z: i32) -> (i32, i32) {
        match self {
            Rotation::None => (x, z),
            Rotation::Cw90 => (-z, x),
            Rotation::Cw180 => (-x, -z),
            Rotation::Cw270 => (z, -x),
        }
    }

    /// Rotate a cell index inside a `w x d` footprint, yielding an index
    /// inside the rotated footprint (whose dims are swapped for 90/270).
    pub fn rotate_cell(self, cx: i32, cz: i32, w: i32, d: i32) -> (i32, i32) {
        match self {
            Rotation::None => (cx, cz),
            Rotation::Cw90 => (d - 1 - cz, cx),
            Rotation::Cw180 => (w - 1 - cx, d - 1 - cz),
            Rotation::Cw270 => (cz, w - 1 - cx),
        }
    }
}

/// Effective ground-plane dimensions of a `w x d` footprint after rotation.
pub fn effective_dims(w: i32, d: i32, rotation: Rotation) -> (i32, i32) {
    match rotation {
        Rotation::None | Rotation::Cw180 => (w, d),
        Rotation::Cw90 | Rotation::Cw270 => (d, w),
    }
}

/// An axis-aligned bounding box, inclusive on every axis.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Aabb {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl Aabb {
    pub fn new(min: BlockPos, max: BlockPos) -> Aabb {
        Aabb { min, max }
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    pub fn depth(&self) -> i32 {
        self.max.z - self.min.z + 1
    }

    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= self.min.x
            && x <= self.max.x
            && y >= self.min.y
            && y <= self.max.y
            && z >= self.min.z
            && z <= self.max.z
    }

    pub fn footprint_contains(&self, x: i32, z: i32) -> bool {
        x >= self.min.x && x <= self.max.x && z >= self.min.z && z <= self.max.z
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Inflate by `buf` blocks on every axis.
    pub fn expand(&self, buf: i32) -> Aabb {
        Aabb {
            min: BlockPos::new(self.min.x - buf, self.min.y - buf, self.min.z - buf),
            max: BlockPos::new(self.max.x + buf, self.max.y + buf, self.max.z + buf),
        }
    }
}

/// Compute the exact world bounds of a structure placed at `origin` with
/// pre-rotation base dimensions `(w, h, d)`.
///
/// The eight template-space corners `{0, w} x {0, h} x {0, d}` are rotated
/// about the origin and the axis-aligned envelope is taken; because the
/// sizes are exclusive counts mapped onto inclusive indices, one is
/// subtracted from each max axis exactly once, here.
pub fn rotated_bounds(origin: BlockPos, w: i32, h: i32, d: i32, rotation: Rotation) -> Aabb {
    let corners = [(0, 0), (w, 0), (0, d), (w, d)];

    let mut min_x = i32::MAX;
    let mut max_x = i32::MIN;
    let mut min_z = i32::MAX;
    let mut max_z = i32::MIN;
    for (cx, cz) in corners {
        let (rx, rz) = rotation.rotate_vec(cx, cz);
        min_x = min_x.min(rx);
        max_x = max_x.max(rx);
        min_z = min_z.min(rz);
        max_z = max_z.max(rz);
    }

    Aabb {
        min: BlockPos::new(origin.x + min_x, origin.y, origin.z + min_z),
        max: BlockPos::new(origin.x + max_x - 1, origin.y + h - 1, origin.z + max_z - 1),
    }
}

/// Candidate offsets for the orchestrator's outward search: concentric
/// square rings of growing radius on a `step` grid. Ring order (then
/// `(dx, dz)` scan order within a ring) is the deterministic tie-break for
/// equally distant candidates.
pub fn ring_scan_offsets(max_radius: i32, step: i32) -> Vec<(i32, i32)> {
    let mut offsets = vec![(0, 0)];
    let mut r = step;
    while r <= max_radius {
        for dx in (-r..=r).step_by(step as usize) {
            for dz in (-r..=r).step_by(step as usize) {
                if dx.abs().max(dz.abs()) == r {
                    offsets.push((dx, dz));
                }
            }
        }
        r += step;
    }
    offsets
}
