use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A template for instantiating one building: the gameplay header fields plus
/// the structural sub-record (exterior and interior layout).
///
/// Field names serialize in PascalCase so the files round-trip with the
/// building replacement format other tools already write. The sub-record is
/// carried opaquely and passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildingReplacement {
    pub faction_id: u16,
    pub quality: u8,
    pub building_type: i32,
    pub name_seed: u16,
    #[serde(default)]
    pub rmb_sub_record: serde_json::Value,
}

impl BuildingReplacement {
    pub fn read_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading building file {}", path.as_ref().display()))?;
        let replacement = serde_json::from_str(&data)?;
        Ok(replacement)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

/// The header fields of one building inside a preset block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildingData {
    pub faction_id: u16,
    pub quality: u8,
    pub building_type: i32,
    pub name_seed: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FldHeader {
    building_data_list: Vec<BuildingData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RmbBlockData {
    fld_header: FldHeader,
    // Sub-records stay opaque; only their count and order matter here.
    sub_records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PresetBlock {
    rmb_block: RmbBlockData,
}

/// The preset block files, one per building group. A building type code like
/// `"0801"` means group 8 ("Tavern"), building 1 within that group's block.
const PRESET_GROUPS: &[(u8, &str)] = &[
    (1, "House1.json"),
    (2, "House2.json"),
    (3, "House3.json"),
    (4, "House4.json"),
    (5, "House5.json"),
    (6, "House6.json"),
    (7, "HouseForSale.json"),
    (8, "Tavern.json"),
    (9, "GuildHall.json"),
    (10, "Temple.json"),
    (11, "FurnitureStore.json"),
    (12, "Bank.json"),
    (13, "GeneralStore.json"),
    (14, "PawnShop.json"),
    (15, "Armorer.json"),
    (16, "WeaponSmith.json"),
    (17, "ClothingStore.json"),
    (18, "Alchemist.json"),
    (19, "GemStore.json"),
    (20, "Bookseller.json"),
    (21, "Library.json"),
    (22, "Palace.json"),
    (23, "Town23.json"),
    (24, "Ship.json"),
];

/// Preset building blocks loaded from a directory, looked up by building
/// type code to produce a fresh [`BuildingReplacement`].
pub struct BuildingPresets {
    groups: HashMap<u8, PresetBlock>,
}

impl BuildingPresets {
    /// Loads every known preset block file found under `dir`. Missing files
    /// are skipped; their groups simply resolve to an error on lookup.
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut groups = HashMap::new();
        for (group, file_name) in PRESET_GROUPS {
            let path = dir.as_ref().join(file_name);
            let data = match fs::read_to_string(&path) {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("No preset block {}", path.display());
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("reading preset {}", path.display()));
                }
            };
            let block: PresetBlock = serde_json::from_str(&data)
                .with_context(|| format!("parsing preset {}", path.display()))?;
            groups.insert(*group, block);
        }
        log::debug!("Loaded {} preset building groups", groups.len());
        Ok(Self { groups })
    }

    /// Assembles a replacement template for `building_id`: the first two
    /// digits select the group, the remainder is the 1-based index into that
    /// group's block.
    pub fn building_data(&self, building_id: &str) -> anyhow::Result<BuildingReplacement> {
        let (group, index) = parse_building_id(building_id)?;
        let block = self
            .groups
            .get(&group)
            .ok_or_else(|| anyhow::anyhow!("unknown building group {:02}", group))?;

        let data = block
            .rmb_block
            .fld_header
            .building_data_list
            .get(index - 1)
            .ok_or_else(|| {
                anyhow::anyhow!("building group {:02} has no building {}", group, index)
            })?;
        let sub_record = block
            .rmb_block
            .sub_records
            .get(index - 1)
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!("building group {:02} has no sub-record {}", group, index)
            })?;

        Ok(BuildingReplacement {
            faction_id: data.faction_id,
            quality: data.quality,
            building_type: data.building_type,
            name_seed: data.name_seed,
            rmb_sub_record: sub_record,
        })
    }

    pub fn has_group(&self, group: u8) -> bool {
        self.groups.contains_key(&group)
    }
}

fn parse_building_id(building_id: &str) -> anyhow::Result<(u8, usize)> {
    anyhow::ensure!(
        building_id.len() >= 3 && building_id.bytes().all(|b| b.is_ascii_digit()),
        "invalid building id {:?}, expected a numeric code like \"0801\"",
        building_id
    );
    let group: u8 = building_id[..2].parse()?;
    let index: usize = building_id[2..].parse()?;
    anyhow::ensure!(index >= 1, "building index in {:?} is 1-based", building_id);
    Ok((group, index))
}
