use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::catalog::CatalogItem;

/// Manifest file each installed mod carries, named `<anything>.mod.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModManifest {
    #[serde(rename = "ModTitle")]
    pub title: String,
    /// Relative paths of the files the mod ships. May be empty for loose
    /// dev mods, in which case the mod directory is walked instead.
    #[serde(rename = "Files", default)]
    pub files: Vec<String>,
}

/// How a file inside a mod is classified for catalog purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModFileKind {
    /// A custom 3D model whose numeric file stem is the model id.
    Model { id: String },
    /// A billboard image named `<archive>_<record>-<index>.<ext>`; the
    /// catalog id is `<archive>.<record>`.
    BillboardImage { id: String },
    /// Billboard sizing metadata, same naming convention with an xml
    /// extension. Tracked but produces no catalog entry.
    BillboardMeta,
    Other,
}

/// Classifies one mod file path by its filename pattern. Anything that does
/// not match a known pattern is [`ModFileKind::Other`] and ignored.
pub fn classify(path: &str) -> ModFileKind {
    let path = Path::new(path);
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return ModFileKind::Other;
    };
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return ModFileKind::Other;
    };

    match ext.to_ascii_lowercase().as_str() {
        "obj" | "fbx" | "prefab" if stem.parse::<u32>().is_ok() => ModFileKind::Model {
            id: stem.to_string(),
        },
        "png" | "jpg" if is_billboard_stem(stem) => ModFileKind::BillboardImage {
            id: billboard_id(stem),
        },
        "xml" if is_billboard_stem(stem) => ModFileKind::BillboardMeta,
        _ => ModFileKind::Other,
    }
}

fn is_billboard_stem(stem: &str) -> bool {
    let Some((archive_record, index)) = stem.split_once('-') else {
        return false;
    };
    let Some((archive, record)) = archive_record.split_once('_') else {
        return false;
    };
    [archive, record, index]
        .iter()
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

fn billboard_id(stem: &str) -> String {
    let base = stem.split('-').next().unwrap_or(stem);
    base.replace('_', ".")
}

/// Everything the scan learned about one installed mod.
#[derive(Debug, Clone, Default)]
pub struct ModContent {
    pub title: String,
    pub models: BTreeSet<String>,
    pub flats: BTreeSet<String>,
    pub billboard_meta: BTreeSet<String>,
}

impl ModContent {
    fn record(&mut self, file: &str) {
        match classify(file) {
            ModFileKind::Model { id } => {
                self.models.insert(id);
            }
            ModFileKind::BillboardImage { id } => {
                self.flats.insert(id);
            }
            ModFileKind::BillboardMeta => {
                self.billboard_meta.insert(file.to_string());
            }
            ModFileKind::Other => {}
        }
    }
}

/// Source of installed mods. The directory scanner below covers loose dev
/// mods; packaged bundle formats live behind their own implementation of
/// this trait in whatever packaging system feeds the editor.
pub trait ModProvider {
    fn mods(&self) -> anyhow::Result<Vec<ModContent>>;
}

/// Scans a directory of loose "dev" mods: every subdirectory holding a
/// `*.mod.json` manifest counts as one mod.
pub struct DevModProvider {
    root: PathBuf,
}

impl DevModProvider {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn read_manifest(mod_dir: &Path) -> anyhow::Result<Option<ModManifest>> {
        for entry in fs::read_dir(mod_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.is_file() && name.ends_with(".mod.json") {
                let data = fs::read_to_string(&path)?;
                let manifest: ModManifest = serde_json::from_str(&data)?;
                return Ok(Some(manifest));
            }
        }
        Ok(None)
    }

    /// Files for a mod whose manifest lists none: walk the mod directory.
    fn walk_files(mod_dir: &Path) -> Vec<String> {
        WalkDir::new(mod_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.path().to_str().map(|s| s.to_string()))
            .collect()
    }
}

impl ModProvider for DevModProvider {
    fn mods(&self) -> anyhow::Result<Vec<ModContent>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let mod_dir = entry?.path();
            if !mod_dir.is_dir() {
                continue;
            }
            let manifest = match Self::read_manifest(&mod_dir) {
                Ok(Some(manifest)) => manifest,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping mod at {}: {}", mod_dir.display(), e);
                    continue;
                }
            };

            let mut content = ModContent {
                title: manifest.title.clone(),
                ..Default::default()
            };
            let files = if manifest.files.is_empty() {
                Self::walk_files(&mod_dir)
            } else {
                manifest.files
            };
            for file in &files {
                content.record(file);
            }
            log::debug!(
                "Mod {:?}: {} models, {} flats",
                content.title,
                content.models.len(),
                content.flats.len()
            );
            out.push(content);
        }
        Ok(out)
    }
}

/// Walks every registered provider and turns what it finds into catalog
/// entries under the `"Mods"` category, one subcategory per mod.
///
/// Ids are not deduplicated across mods; the downstream catalog merge
/// resolves collisions last-write-wins.
pub struct ModScanner {
    providers: Vec<Box<dyn ModProvider>>,
}

impl ModScanner {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// A scanner over one loose-mods directory.
    pub fn dev(root: impl AsRef<Path>) -> Self {
        Self::new().with_provider(Box::new(DevModProvider::new(root)))
    }

    pub fn with_provider(mut self, provider: Box<dyn ModProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn catalog_models(&self) -> Vec<CatalogItem> {
        self.collect(|content| &content.models)
    }

    pub fn catalog_flats(&self) -> Vec<CatalogItem> {
        self.collect(|content| &content.flats)
    }

    fn collect<F>(&self, pick: F) -> Vec<CatalogItem>
    where
        F: Fn(&ModContent) -> &BTreeSet<String>,
    {
        let mut items = Vec::new();
        for provider in &self.providers {
            let mods = match provider.mods() {
                Ok(mods) => mods,
                Err(e) => {
                    log::warn!("Mod provider failed: {}", e);
                    continue;
                }
            };
            for content in &mods {
                for id in pick(content) {
                    items.push(CatalogItem::with_category(
                        id.clone(),
                        id.clone(),
                        "Mods",
                        content.title.clone(),
                    ));
                }
            }
        }
        items
    }
}

impl Default for ModScanner {
    fn default() -> Self {
        Self::new()
    }
}
