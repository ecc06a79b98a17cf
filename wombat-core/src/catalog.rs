use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One entry in a catalog.
///
/// Field names are renamed to match the on-disk catalog format, so files
/// written by older tools (and shared catalogs from other users) load
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Label", default)]
    pub label: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Subcategory", default)]
    pub subcategory: String,
    #[serde(rename = "Tags", default)]
    pub tags: String,
}

impl CatalogItem {
    /// A bare item with the label defaulting to the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            category: String::new(),
            subcategory: String::new(),
            tags: String::new(),
        }
    }

    pub fn with_label(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category: String::new(),
            subcategory: String::new(),
            tags: String::new(),
        }
    }

    pub fn with_category(
        id: impl Into<String>,
        label: impl Into<String>,
        category: impl Into<String>,
        subcategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category: category.into(),
            subcategory: subcategory.into(),
            tags: String::new(),
        }
    }
}

/// On-disk wrapper shape. [`read_items`] also tolerates a bare array.
#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "_list")]
    list: Vec<CatalogItem>,
}

#[derive(Serialize)]
struct CatalogFileRef<'a> {
    #[serde(rename = "_list")]
    list: &'a [CatalogItem],
}

/// Parses catalog JSON, accepting either the `{"_list": [...]}` wrapper or a
/// bare array of items.
pub fn parse_items(data: &str) -> anyhow::Result<Vec<CatalogItem>> {
    if let Ok(file) = serde_json::from_str::<CatalogFile>(data) {
        return Ok(file.list);
    }
    let list: Vec<CatalogItem> = serde_json::from_str(data)?;
    Ok(list)
}

/// Reads a catalog item list from a file.
pub fn read_items(path: impl AsRef<Path>) -> anyhow::Result<Vec<CatalogItem>> {
    let data = fs::read_to_string(path.as_ref())?;
    parse_items(&data)
}

/// Writes a catalog item list to a file in wrapper form, creating the
/// containing directory if needed.
pub fn write_items(path: impl AsRef<Path>, items: &[CatalogItem]) -> anyhow::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&CatalogFileRef { list: items })?;
    fs::write(path.as_ref(), json)?;
    Ok(())
}

/// A persisted, ordered collection of [`CatalogItem`] for one domain
/// (models, flats or buildings), plus lookup maps derived from it.
///
/// The ordered list is the source of truth and the only thing persisted.
/// The derived maps are rebuilt from scratch by every mutating operation,
/// so they can never go stale; they are exposed read-only.
pub struct Catalog {
    file_path: PathBuf,
    default_json: String,

    list: Vec<CatalogItem>,
    items: HashMap<String, CatalogItem>,
    subcategories: HashMap<String, HashSet<String>>,
    categories: HashMap<String, HashSet<String>>,
}

impl Catalog {
    /// Creates an empty catalog backed by `file_path`, with `default_json`
    /// as the bundled content to fall back on. Call [`Catalog::load`] to
    /// populate it.
    pub fn new(file_path: impl AsRef<Path>, default_json: impl Into<String>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            default_json: default_json.into(),
            list: Vec::new(),
            items: HashMap::new(),
            subcategories: HashMap::new(),
            categories: HashMap::new(),
        }
    }

    /// Loads the persisted file, falling back to the bundled default when the
    /// file is missing or does not parse. The fallback is persisted
    /// immediately, so a corrupt file heals itself on the next load.
    ///
    /// File errors are logged rather than propagated; after `load` the
    /// catalog always holds something usable.
    pub fn load(&mut self) {
        match fs::read_to_string(&self.file_path) {
            Ok(data) => match parse_items(&data) {
                Ok(list) => {
                    self.list = list;
                    self.rebuild();
                    log::debug!(
                        "Loaded {} catalog items from {}",
                        self.list.len(),
                        self.file_path.display()
                    );
                    return;
                }
                Err(e) => {
                    log::warn!(
                        "Catalog file {} is corrupt ({}), restoring default",
                        self.file_path.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "Catalog file {} not found, seeding default",
                    self.file_path.display()
                );
            }
            Err(e) => {
                log::warn!(
                    "Failed to read catalog file {}: {}, using default",
                    self.file_path.display(),
                    e
                );
            }
        }

        self.list = parse_items(&self.default_json).unwrap_or_else(|e| {
            log::error!("Bundled default catalog does not parse: {}", e);
            Vec::new()
        });
        self.rebuild();
        if let Err(e) = self.save() {
            log::warn!(
                "Failed to persist default catalog to {}: {}",
                self.file_path.display(),
                e
            );
        }
    }

    /// Serializes the ordered item list to the persisted file. Does not touch
    /// the derived maps.
    pub fn save(&self) -> anyhow::Result<()> {
        write_items(&self.file_path, &self.list)
    }

    /// Replaces the item list wholesale, rebuilds the derived maps and
    /// persists.
    pub fn set(&mut self, items: Vec<CatalogItem>) -> anyhow::Result<()> {
        self.list = items;
        self.rebuild();
        self.save()
    }

    /// Appends one item, rebuilds and persists. A duplicate id is kept in the
    /// list; the id-map resolves it last-write-wins.
    pub fn add(&mut self, item: CatalogItem) -> anyhow::Result<()> {
        self.list.push(item);
        self.rebuild();
        self.save()
    }

    /// Removes every occurrence of `id`, rebuilds and persists.
    pub fn remove(&mut self, id: &str) -> anyhow::Result<()> {
        self.list.retain(|item| item.id != id);
        self.rebuild();
        self.save()
    }

    /// Replaces the item with the same id in place, or appends when absent.
    pub fn replace(&mut self, item: CatalogItem) -> anyhow::Result<()> {
        match self.list.iter().position(|e| e.id == item.id) {
            Some(pos) => self.list[pos] = item,
            None => self.list.push(item),
        }
        self.rebuild();
        self.save()
    }

    /// Merges an incoming item list: entries whose id already exists replace
    /// the existing entry in place, new ids are appended. Right-biased, so an
    /// imported catalog wins on collision.
    pub fn merge(&mut self, incoming: Vec<CatalogItem>) -> anyhow::Result<()> {
        for item in incoming {
            match self.list.iter().position(|e| e.id == item.id) {
                Some(pos) => self.list[pos] = item,
                None => self.list.push(item),
            }
        }
        self.rebuild();
        self.save()
    }

    /// Throws away the current list and reseeds from the bundled default.
    pub fn restore_default(&mut self) -> anyhow::Result<()> {
        let items = parse_items(&self.default_json)?;
        self.set(items)
    }

    pub fn list(&self) -> &[CatalogItem] {
        &self.list
    }

    /// The derived id-to-item map. Entries have category and subcategory
    /// defaults applied; on duplicate ids the last list occurrence wins.
    pub fn items(&self) -> &HashMap<String, CatalogItem> {
        &self.items
    }

    /// The derived subcategory-to-ids map.
    pub fn subcategories(&self) -> &HashMap<String, HashSet<String>> {
        &self.subcategories
    }

    /// The derived category-to-subcategories map.
    pub fn categories(&self) -> &HashMap<String, HashSet<String>> {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.get(id)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Rebuilds the three derived maps from the list, in list order.
    ///
    /// An empty category becomes `"Other"` and an empty subcategory becomes
    /// `"<category>_root"`, the sentinel for "no explicit subcategory". The
    /// defaults go into the derived entries; the persisted list keeps what
    /// the user wrote.
    fn rebuild(&mut self) {
        self.items.clear();
        self.subcategories.clear();
        self.categories.clear();

        for item in &self.list {
            let mut item = item.clone();
            if item.label.is_empty() {
                item.label = item.id.clone();
            }
            if item.category.is_empty() {
                item.category = "Other".to_string();
            }
            if item.subcategory.is_empty() {
                item.subcategory = format!("{}_root", item.category);
            }

            self.subcategories
                .entry(item.subcategory.clone())
                .or_default()
                .insert(item.id.clone());
            self.categories
                .entry(item.category.clone())
                .or_default()
                .insert(item.subcategory.clone());
            self.items.insert(item.id.clone(), item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch_catalog(dir: &TempDir, default_json: &str) -> Catalog {
        Catalog::new(dir.path().join("test-catalog.json"), default_json)
    }

    #[test]
    fn rebuild_applies_category_defaults() {
        let dir = TempDir::new().unwrap();
        let mut catalog = scratch_catalog(&dir, "[]");
        catalog
            .set(vec![CatalogItem::new("41700"), CatalogItem::with_category("41701", "", "Furniture", "")])
            .unwrap();

        let bare = catalog.get("41700").unwrap();
        assert_eq!(bare.category, "Other");
        assert_eq!(bare.subcategory, "Other_root");

        let furniture = catalog.get("41701").unwrap();
        assert_eq!(furniture.label, "41701");
        assert_eq!(furniture.category, "Furniture");
        assert_eq!(furniture.subcategory, "Furniture_root");

        assert!(catalog.categories()["Other"].contains("Other_root"));
        assert!(catalog.subcategories()["Furniture_root"].contains("41701"));
    }

    #[test]
    fn derived_maps_never_hold_empty_fields() {
        let dir = TempDir::new().unwrap();
        let mut catalog = scratch_catalog(&dir, "[]");
        catalog
            .set(vec![
                CatalogItem::new("1"),
                CatalogItem::with_category("2", "two", "Lights", ""),
                CatalogItem::with_category("3", "three", "", "weird"),
            ])
            .unwrap();

        for item in catalog.items().values() {
            assert!(!item.category.is_empty());
            assert!(!item.subcategory.is_empty());
        }
        // An explicit subcategory with no category still lands under Other.
        assert_eq!(catalog.get("3").unwrap().category, "Other");
        assert_eq!(catalog.get("3").unwrap().subcategory, "weird");
    }

    #[test]
    fn duplicate_id_last_occurrence_wins() {
        let dir = TempDir::new().unwrap();
        let mut catalog = scratch_catalog(&dir, "[]");
        catalog
            .set(vec![
                CatalogItem::with_label("1", "a"),
                CatalogItem::with_label("1", "b"),
            ])
            .unwrap();

        assert_eq!(catalog.list().len(), 2);
        assert_eq!(catalog.get("1").unwrap().label, "b");
    }

    #[test]
    fn set_is_idempotent_on_derived_maps() {
        let dir = TempDir::new().unwrap();
        let mut catalog = scratch_catalog(&dir, "[]");
        let items = vec![
            CatalogItem::with_category("1", "one", "Nature", "Trees"),
            CatalogItem::new("2"),
        ];
        catalog.set(items.clone()).unwrap();
        let first_items = catalog.items().clone();
        let first_subs = catalog.subcategories().clone();
        let first_cats = catalog.categories().clone();

        catalog.set(items).unwrap();
        assert_eq!(catalog.items(), &first_items);
        assert_eq!(catalog.subcategories(), &first_subs);
        assert_eq!(catalog.categories(), &first_cats);
    }

    #[test]
    fn merge_is_right_biased_and_keeps_both_sides() {
        let dir = TempDir::new().unwrap();
        let mut catalog = scratch_catalog(&dir, "[]");
        catalog
            .set(vec![
                CatalogItem::with_label("X", "ours"),
                CatalogItem::with_label("A", "only ours"),
            ])
            .unwrap();

        catalog
            .merge(vec![
                CatalogItem::with_label("X", "theirs"),
                CatalogItem::with_label("B", "only theirs"),
            ])
            .unwrap();

        assert_eq!(catalog.get("X").unwrap().label, "theirs");
        assert_eq!(catalog.get("A").unwrap().label, "only ours");
        assert_eq!(catalog.get("B").unwrap().label, "only theirs");
        assert_eq!(catalog.list().len(), 3);
    }

    #[test]
    fn missing_file_seeds_default_and_persists_it() {
        let dir = TempDir::new().unwrap();
        let default = r#"[{"ID": "199.16", "Label": "Editor marker"}]"#;
        let mut catalog = scratch_catalog(&dir, default);
        catalog.load();

        assert_eq!(catalog.list().len(), 1);
        assert_eq!(catalog.get("199.16").unwrap().label, "Editor marker");
        assert!(catalog.file_path().exists());
    }

    #[test]
    fn corrupt_file_self_heals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test-catalog.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut catalog = Catalog::new(&path, r#"[{"ID": "210.0"}]"#);
        catalog.load();
        assert_eq!(catalog.list().len(), 1);

        // The rewritten file must now parse on its own.
        let items = read_items(&path).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "210.0");
    }

    #[test]
    fn load_accepts_bare_array_and_wrapper() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test-catalog.json");

        std::fs::write(&path, r#"[{"ID": "1"}]"#).unwrap();
        let mut catalog = Catalog::new(&path, "[]");
        catalog.load();
        assert_eq!(catalog.list().len(), 1);

        std::fs::write(&path, r#"{"_list": [{"ID": "1"}, {"ID": "2"}]}"#).unwrap();
        catalog.load();
        assert_eq!(catalog.list().len(), 2);
    }

    #[test]
    fn save_writes_wrapper_form() {
        let dir = TempDir::new().unwrap();
        let mut catalog = scratch_catalog(&dir, "[]");
        catalog.set(vec![CatalogItem::new("1")]).unwrap();

        let data = std::fs::read_to_string(catalog.file_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert!(value.get("_list").is_some());
    }

    #[test]
    fn remove_and_replace_keep_indexes_current() {
        let dir = TempDir::new().unwrap();
        let mut catalog = scratch_catalog(&dir, "[]");
        catalog
            .set(vec![
                CatalogItem::with_category("1", "one", "Lights", ""),
                CatalogItem::with_category("2", "two", "Lights", ""),
            ])
            .unwrap();

        catalog.remove("1").unwrap();
        assert!(catalog.get("1").is_none());
        assert!(!catalog.subcategories()["Lights_root"].contains("1"));

        catalog
            .replace(CatalogItem::with_category("2", "two", "Nature", ""))
            .unwrap();
        assert_eq!(catalog.get("2").unwrap().category, "Nature");
        assert!(!catalog.subcategories().contains_key("Lights_root"));
    }
}
