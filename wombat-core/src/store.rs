use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::building::BuildingReplacement;
use crate::catalog::{Catalog, CatalogItem};

const DEFAULT_MODELS: &str = include_str!("../defaults/models-catalog.json");
const DEFAULT_FLATS: &str = include_str!("../defaults/flats-catalog.json");
const DEFAULT_BUILDINGS: &str = include_str!("../defaults/buildings-catalog.json");

pub const MODELS_CATALOG_FILE: &str = "models-catalog.json";
pub const FLATS_CATALOG_FILE: &str = "flats-catalog.json";
pub const BUILDINGS_CATALOG_FILE: &str = "buildings-catalog.json";
pub const BUILDINGS_TEMPLATES_FILE: &str = "buildings-templates.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogDomain {
    Models,
    Flats,
    Buildings,
}

/// Shareable buildings file: the item list together with the replacement
/// templates the items refer to.
#[derive(Serialize, Deserialize)]
struct BuildingsExport {
    #[serde(rename = "_list")]
    list: Vec<CatalogItem>,
    #[serde(default)]
    templates: HashMap<String, BuildingReplacement>,
}

/// The three persisted catalogs of one project, rooted at a settings
/// directory, plus the buildings template map.
///
/// Construct it where the session starts and pass it around; the backing
/// file paths are fixed at construction.
pub struct CatalogStore {
    settings_dir: PathBuf,
    pub models: Catalog,
    pub flats: Catalog,
    pub buildings: Catalog,
    templates: HashMap<String, BuildingReplacement>,
}

impl CatalogStore {
    /// A store rooted directly at `settings_dir`.
    pub fn new(settings_dir: impl AsRef<Path>) -> Self {
        let dir = settings_dir.as_ref();
        Self {
            models: Catalog::new(dir.join(MODELS_CATALOG_FILE), DEFAULT_MODELS),
            flats: Catalog::new(dir.join(FLATS_CATALOG_FILE), DEFAULT_FLATS),
            buildings: Catalog::new(dir.join(BUILDINGS_CATALOG_FILE), DEFAULT_BUILDINGS),
            templates: HashMap::new(),
            settings_dir: dir.to_path_buf(),
        }
    }

    /// A store at the conventional settings location inside a project:
    /// `<project>/Editor/Settings/Wombat/`.
    pub fn in_project(project_root: impl AsRef<Path>) -> Self {
        Self::new(project_root.as_ref().join("Editor/Settings/Wombat"))
    }

    /// Loads all three catalogs and the template map. Missing or corrupt
    /// files degrade to defaults (catalogs) or empty (templates).
    pub fn load_all(&mut self) {
        self.models.load();
        self.flats.load();
        self.buildings.load();
        self.load_templates();
    }

    pub fn catalog(&self, domain: CatalogDomain) -> &Catalog {
        match domain {
            CatalogDomain::Models => &self.models,
            CatalogDomain::Flats => &self.flats,
            CatalogDomain::Buildings => &self.buildings,
        }
    }

    pub fn catalog_mut(&mut self, domain: CatalogDomain) -> &mut Catalog {
        match domain {
            CatalogDomain::Models => &mut self.models,
            CatalogDomain::Flats => &mut self.flats,
            CatalogDomain::Buildings => &mut self.buildings,
        }
    }

    pub fn template(&self, id: &str) -> Option<&BuildingReplacement> {
        self.templates.get(id)
    }

    pub fn templates(&self) -> &HashMap<String, BuildingReplacement> {
        &self.templates
    }

    pub fn set_template(
        &mut self,
        id: impl Into<String>,
        template: BuildingReplacement,
    ) -> anyhow::Result<()> {
        self.templates.insert(id.into(), template);
        self.save_templates()
    }

    pub fn remove_template(&mut self, id: &str) -> anyhow::Result<()> {
        self.templates.remove(id);
        self.save_templates()
    }

    fn templates_path(&self) -> PathBuf {
        self.settings_dir.join(BUILDINGS_TEMPLATES_FILE)
    }

    fn load_templates(&mut self) {
        let path = self.templates_path();
        match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(templates) => self.templates = templates,
                Err(e) => {
                    log::warn!("Template file {} is corrupt ({}), starting empty", path.display(), e);
                    self.templates = HashMap::new();
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.templates = HashMap::new();
            }
            Err(e) => {
                log::warn!("Failed to read template file {}: {}", path.display(), e);
                self.templates = HashMap::new();
            }
        }
    }

    fn save_templates(&self) -> anyhow::Result<()> {
        let path = self.templates_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.templates)?;
        fs::write(&path, json)?;
        Ok(())
    }

    /// Writes the buildings catalog and its templates as one shareable file.
    pub fn export_buildings(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let export = BuildingsExport {
            list: self.buildings.list().to_vec(),
            templates: self.templates.clone(),
        };
        let json = serde_json::to_string_pretty(&export)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Imports a shareable buildings file: items merge into the catalog
    /// (incoming wins on id collision), templates overwrite by id.
    pub fn import_buildings(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let data = fs::read_to_string(path.as_ref())?;
        let import: BuildingsExport = serde_json::from_str(&data)?;
        self.buildings.merge(import.list)?;
        self.templates.extend(import.templates);
        self.save_templates()
    }

    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_seeds_bundled_defaults() {
        let dir = TempDir::new().unwrap();
        let mut store = CatalogStore::new(dir.path());
        store.load_all();

        assert!(!store.models.list().is_empty());
        assert!(!store.flats.list().is_empty());
        assert!(!store.buildings.list().is_empty());
        assert!(dir.path().join(MODELS_CATALOG_FILE).exists());
        assert!(dir.path().join(FLATS_CATALOG_FILE).exists());
        assert!(dir.path().join(BUILDINGS_CATALOG_FILE).exists());
        assert!(store.templates().is_empty());
    }

    #[test]
    fn in_project_uses_the_settings_convention() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::in_project(dir.path());
        assert_eq!(
            store.settings_dir(),
            dir.path().join("Editor/Settings/Wombat")
        );
    }

    #[test]
    fn templates_persist_across_stores() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = CatalogStore::new(dir.path());
            store.load_all();
            store
                .set_template("0801", BuildingReplacement {
                    faction_id: 40,
                    quality: 12,
                    building_type: 15,
                    name_seed: 1,
                    rmb_sub_record: serde_json::Value::Null,
                })
                .unwrap();
        }

        let mut store = CatalogStore::new(dir.path());
        store.load_all();
        assert_eq!(store.template("0801").unwrap().faction_id, 40);
    }

    #[test]
    fn buildings_export_import_round_trip() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let file = source_dir.path().join("shared-buildings.json");

        let mut source = CatalogStore::new(source_dir.path().join("settings"));
        source.load_all();
        source
            .buildings
            .add(CatalogItem::with_category("9901", "Custom tower", "Custom", ""))
            .unwrap();
        source
            .set_template("9901", BuildingReplacement {
                faction_id: 1,
                quality: 5,
                building_type: 0,
                name_seed: 9,
                rmb_sub_record: serde_json::json!({"XPos": 0}),
            })
            .unwrap();
        source.export_buildings(&file).unwrap();

        let mut target = CatalogStore::new(target_dir.path());
        target.load_all();
        target.import_buildings(&file).unwrap();

        assert_eq!(target.buildings.get("9901").unwrap().label, "Custom tower");
        assert_eq!(target.template("9901").unwrap().quality, 5);
    }
}
