use crate::block::{BlockMaterial, Facing};
use crate::error::StoreError;
use fnv::FnvHashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// One voxel of a structure clipboard, in template space.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClipboardCell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub material: BlockMaterial,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<Facing>,
}

/// A voxel-accurate structure snapshot. Normalized so the origin is the
/// minimum corner: pasting at `O` places the min corner at `O`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clipboard {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub cells: Vec<ClipboardCell>,
}

impl Clipboard {
    /// Shift all cells so the minimum occupied corner is `(0, 0, 0)`.
    pub fn normalized(mut self) -> Clipboard {
        if self.cells.is_empty() {
            return self;
        }
        let min_x = self.cells.iter().map(|c| c.x).min().unwrap_or(0);
        let min_y = self.cells.iter().map(|c| c.y).min().unwrap_or(0);
        let min_z = self.cells.iter().map(|c| c.z).min().unwrap_or(0);
        if min_x != 0 || min_y != 0 || min_z != 0 {
            for cell in &mut self.cells {
                cell.x -= min_x;
                cell.y -= min_y;
                cell.z -= min_z;
            }
        }
        self
    }
}

/// Where a template's blocks come from: a clipboard payload, or the
/// deterministic procedural builder keyed by structure id.
#[derive(Clone, Debug, PartialEq)]
pub enum StructureSource {
    Clipboard(Clipboard),
    Procedural(String),
}

/// A placeable structure: pre-rotation dimensions, entrance anchor, and
/// the block source.
#[derive(Clone, Debug, PartialEq)]
pub struct StructureTemplate {
    pub structure_id: String,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    /// Entrance anchor offset relative to the template origin.
    pub anchor: (i32, i32, i32),
    /// Outward entrance facing, pre-rotation.
    pub facing: Facing,
    pub source: StructureSource,
}

impl StructureTemplate {
    pub fn dimensions(&self) -> (i32, i32, i32) {
        (self.width, self.height, self.depth)
    }

    /// Materialize the template-space cells. Procedural templates build
    /// the same cells every call.
    pub fn cells(&self) -> Vec<ClipboardCell> {
        match &self.source {
            StructureSource::Clipboard(clipboard) => clipboard.cells.clone(),
            StructureSource::Procedural(id) => {
                build_procedural_cells(id, self.width, self.height, self.depth)
            }
        }
    }
}

/// Path materials for a culture, per the emitter's palette table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PathPalette {
    pub path: BlockMaterial,
    pub stair: BlockMaterial,
    pub slab: BlockMaterial,
}

impl PathPalette {
    pub fn for_culture(culture_id: &str) -> PathPalette {
        if culture_id.to_ascii_lowercase().contains("roman") {
            PathPalette {
                path: BlockMaterial::Cobblestone,
                stair: BlockMaterial::CobblestoneStairs,
                slab: BlockMaterial::CobblestoneSlab,
            }
        } else {
            PathPalette {
                path: BlockMaterial::DirtPath,
                stair: BlockMaterial::StoneBrickStairs,
                slab: BlockMaterial::StoneBrickSlab,
            }
        }
    }
}

/// A culture: its ordered structure set and designated main building.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Culture {
    pub culture_id: String,
    pub structures: Vec<String>,
    /// Defaults to the first structure when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_building_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Culture {
    pub fn main_building(&self) -> Option<&str> {
        self.main_building_id
            .as_deref()
            .or_else(|| self.structures.first().map(String::as_str))
    }

    pub fn palette(&self) -> PathPalette {
        PathPalette::for_culture(&self.culture_id)
    }
}

/// Template file schema. A directory entry is either this or a `Culture`.
#[derive(Deserialize)]
struct TemplateFile {
    structure_id: String,
    dimensions: [i32; 3],
    entrance: EntranceDef,
    #[serde(default)]
    cells: Option<Vec<ClipboardCell>>,
}

#[derive(Deserialize)]
struct EntranceDef {
    offset: [i32; 3],
    facing: Facing,
}

/// Registry of structure templates and cultures. Templates missing from
/// the directory fall back to the procedural builder, so a catalog can
/// always produce every structure a culture names.
pub struct StructureCatalog {
    directory: Option<PathBuf>,
    templates: FnvHashMap<String, StructureTemplate>,
    cultures: FnvHashMap<String, Culture>,
}

impl StructureCatalog {
    /// Catalog with the built-in cultures and no clipboard templates.
    pub fn builtin() -> StructureCatalog {
        let mut catalog = StructureCatalog {
            directory: None,
            templates: FnvHashMap::default(),
            cultures: FnvHashMap::default(),
        };
        catalog.add_culture(Culture {
            culture_id: "roman".to_string(),
            structures: vec![
                "forum".to_string(),
                "villa".to_string(),
                "taberna".to_string(),
                "well".to_string(),
            ],
            main_building_id: Some("forum".to_string()),
            display_name: Some("Roman".to_string()),
        });
        catalog.add_culture(Culture {
            culture_id: "default".to_string(),
            structures: vec![
                "hall".to_string(),
                "house".to_string(),
                "well".to_string(),
            ],
            main_building_id: None,
            display_name: None,
        });
        catalog
    }

    /// Load templates and cultures from a directory of JSON files; entries
    /// are routed by their identifying field.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<StructureCatalog, StoreError> {
        let mut catalog = StructureCatalog::builtin();
        catalog.directory = Some(dir.as_ref().to_path_buf());
        catalog.load_entries()?;
        Ok(catalog)
    }

    fn load_entries(&mut self) -> Result<(), StoreError> {
        let Some(dir) = self.directory.clone() else {
            return Ok(());
        };
        if !dir.exists() {
            warn!("[STRUCT] catalog directory {} does not exist", dir.display());
            return Ok(());
        }
        let mut loaded = 0usize;
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            if let Ok(template) = serde_json::from_str::<TemplateFile>(&text) {
                self.add_template(template.into_template());
                loaded += 1;
            } else if let Ok(culture) = serde_json::from_str::<Culture>(&text) {
                self.add_culture(culture);
                loaded += 1;
            } else {
                warn!("[STRUCT] skipping unrecognized catalog file {}", path.display());
            }
        }
        info!("[STRUCT] catalog loaded {} entries from {}", loaded, dir.display());
        Ok(())
    }

    /// Re-read the backing directory, keeping built-ins.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let directory = self.directory.take();
        *self = StructureCatalog::builtin();
        self.directory = directory;
        self.load_entries()
    }

    pub fn add_template(&mut self, template: StructureTemplate) {
        self.templates.insert(template.structure_id.clone(), template);
    }

    pub fn add_culture(&mut self, culture: Culture) {
        self.cultures.insert(culture.culture_id.clone(), culture);
    }

    pub fn culture(&self, culture_id: &str) -> Option<&Culture> {
        self.cultures.get(culture_id)
    }

    /// Base dimensions for a structure, falling back to the deterministic
    /// procedural dims when no template file exists.
    pub fn get_dimensions(&self, structure_id: &str) -> (i32, i32, i32) {
        match self.templates.get(structure_id) {
            Some(template) => template.dimensions(),
            None => fallback_dims(structure_id),
        }
    }

    /// The template for a structure id; absent files yield a procedural
    /// template with hash-derived dimensions and a south-facing entrance.
    pub fn get_template(&self, structure_id: &str) -> StructureTemplate {
        if let Some(template) = self.templates.get(structure_id) {
            return template.clone();
        }
        let (w, h, d) = fallback_dims(structure_id);
        StructureTemplate {
            structure_id: structure_id.to_string(),
            width: w,
            height: h,
            depth: d,
            anchor: (w / 2, 0, d - 1),
            facing: Facing::South,
            source: StructureSource::Procedural(structure_id.to_string()),
        }
    }
}

impl TemplateFile {
    fn into_template(self) -> StructureTemplate {
        let [w, h, d] = self.dimensions;
        let [ax, ay, az] = self.entrance.offset;
        let source = match self.cells {
            Some(cells) => StructureSource::Clipboard(
                Clipboard {
                    width: w,
                    height: h,
                    depth: d,
                    cells,
                }
                .normalized(),
            ),
            None => StructureSource::Procedural(self.structure_id.clone()),
        };
        StructureTemplate {
            structure_id: self.structure_id,
            width: w,
            height: h,
            depth: d,
            anchor: (ax, ay, az),
            facing: self.entrance.facing,
            source,
        }
    }
}

fn id_hash(structure_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    structure_id.hash(&mut hasher);
    hasher.finish()
}

/// Hash-derived dimensions for structures without a template file:
/// odd widths 7..13, heights 5..7.
pub fn fallback_dims(structure_id: &str) -> (i32, i32, i32) {
    let hash = id_hash(structure_id);
    let w = 7 + (hash % 4) as i32 * 2;
    let d = 7 + ((hash >> 8) % 4) as i32 * 2;
    let h = 5 + ((hash >> 16) % 3) as i32;
    (w, h, d)
}

/// Deterministic shell builder for procedural structures: cobble floor,
/// plank walls with log corners, flat roof, and a south door opening.
/// Ids containing "well" build a walled water well instead.
pub fn build_procedural_cells(structure_id: &str, w: i32, h: i32, d: i32) -> Vec<ClipboardCell> {
    let mut cells = Vec::new();
    let mut put = |x: i32, y: i32, z: i32, material: BlockMaterial, facing: Option<Facing>| {
        cells.push(ClipboardCell {
            x,
            y,
            z,
            material,
            facing,
        });
    };

    if structure_id.to_ascii_lowercase().contains("well") {
        for x in 0..w {
            for z in 0..d {
                put(x, 0, z, BlockMaterial::Cobblestone, None);
                let is_wall = x == 0 || z == 0 || x == w - 1 || z == d - 1;
                if is_wall {
                    put(x, 1, z, BlockMaterial::Cobblestone, None);
                } else {
                    put(x, 1, z, BlockMaterial::Water, None);
                }
            }
        }
        for (x, z) in [(0, 0), (0, d - 1), (w - 1, 0), (w - 1, d - 1)] {
            for y in 2..h - 1 {
                put(x, y, z, BlockMaterial::OakLog, None);
            }
        }
        for x in 0..w {
            for z in 0..d {
                put(x, h - 1, z, BlockMaterial::OakPlanks, None);
            }
        }
        return cells;
    }

    let roof_y = h - 1;
    let door_x = w / 2;
    for x in 0..w {
        for z in 0..d {
            put(x, 0, z, BlockMaterial::Cobblestone, None);
            put(x, roof_y, z, BlockMaterial::OakPlanks, None);
        }
    }
    for y in 1..roof_y {
        for x in 0..w {
            for z in 0..d {
                let boundary = x == 0 || z == 0 || x == w - 1 || z == d - 1;
                if !boundary {
                    continue;
                }
                let corner = (x == 0 || x == w - 1) && (z == 0 || z == d - 1);
                // Door opening: two cells on the south wall at center.
                if z == d - 1 && x == door_x && y <= 2 {
                    continue;
                }
                let window = y == 2
                    && !corner
                    && ((z == 0 || z == d - 1) && x % 3 == 1 || (x == 0 || x == w - 1) && z % 3 == 1);
                let material = if corner {
                    BlockMaterial::OakLog
                } else if window {
                    BlockMaterial::Glass
                } else {
                    BlockMaterial::OakPlanks
                };
                put(x, y, z, material, None);
            }
        }
    }
    put(door_x, 1, d - 1, BlockMaterial::OakDoor, Some(Facing::South));
    put(w / 2, 1, d / 2, BlockMaterial::Torch, None);
    cells
}
