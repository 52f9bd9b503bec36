//! Asset library - user's collection of reusable images and packs.
//!
//! Plain in-memory store, saved as one JSON file in the data directory.
//! Ids are never reused; operations on unknown ids are no-ops that return
//! `None`/`false`.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use super::asset::{Asset, AssetCategory, AssetFilter, AssetTag, AssetUpdate};

pub const LIBRARY_FILE: &str = "library.json";

fn default_tags() -> Vec<AssetTag> {
    vec![
        AssetTag::new("cute", "hsl(340 70% 80%)"),
        AssetTag::new("main", "hsl(270 60% 70%)"),
        AssetTag::new("accessory", "hsl(160 50% 75%)"),
        AssetTag::new("animation", "hsl(20 80% 80%)"),
    ]
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    assets: Vec<Asset>,
    tags: Vec<AssetTag>,
}

impl Default for Library {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            tags: default_tags(),
        }
    }
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn tags(&self) -> &[AssetTag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| a.id == id)
    }

    /// Add asset, returns its id.
    pub fn add(&mut self, asset: Asset) -> Uuid {
        let id = asset.id;
        debug!("Library: added '{}' to {}", asset.name, asset.category);
        self.assets.push(asset);
        id
    }

    pub fn update(&mut self, id: Uuid, update: AssetUpdate) -> bool {
        match self.get_mut(id) {
            Some(asset) => {
                update.apply(asset);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: Uuid) -> Option<Asset> {
        let pos = self.assets.iter().position(|a| a.id == id)?;
        let removed = self.assets.remove(pos);
        debug!("Library: deleted '{}'", removed.name);
        Some(removed)
    }

    /// Copy an asset under a fresh id, named "<name> (Copy)". Returns the new id.
    pub fn duplicate(&mut self, id: Uuid) -> Option<Uuid> {
        let source = self.get(id)?;
        let mut copy = Asset::new(format!("{} (Copy)", source.name), source.category, source.file_url.clone());
        copy.thumbnail_url = source.thumbnail_url.clone();
        copy.tags = source.tags.clone();
        copy.favorite = source.favorite;
        copy.frame_count = source.frame_count;
        copy.duration_ms = source.duration_ms;
        Some(self.add(copy))
    }

    /// Flip favorite flag. Returns the new value.
    pub fn toggle_favorite(&mut self, id: Uuid) -> Option<bool> {
        let asset = self.get_mut(id)?;
        asset.favorite = !asset.favorite;
        asset.touch();
        Some(asset.favorite)
    }

    /// Register a new tag definition. Returns the created tag.
    pub fn add_tag(&mut self, name: impl Into<String>, color: impl Into<String>) -> AssetTag {
        let tag = AssetTag::new(name, color);
        self.tags.push(tag.clone());
        tag
    }

    pub fn move_to_category(&mut self, id: Uuid, category: AssetCategory) -> bool {
        self.update(
            id,
            AssetUpdate {
                category: Some(category),
                ..Default::default()
            },
        )
    }

    pub fn filtered<'a>(&'a self, filter: &'a AssetFilter) -> impl Iterator<Item = &'a Asset> + 'a {
        self.assets.iter().filter(move |a| filter.matches(a))
    }

    pub fn favorites(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|a| a.favorite)
    }

    /// Load from JSON file. Missing file yields an empty library.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Read library: {}", path.display()))?;
        let library: Library = serde_json::from_str(&json)
            .with_context(|| format!("Parse library: {}", path.display()))?;
        info!("Library loaded: {} assets from {}", library.len(), path.display());
        Ok(library)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Serialize library")?;
        fs::write(path, json).with_context(|| format!("Write library: {}", path.display()))?;
        debug!("Library saved: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Library, Uuid, Uuid) {
        let mut lib = Library::new();
        let a = lib.add(Asset::new("Happy Bunny", AssetCategory::Characters, "bunny.png").with_tags(["cute"]));
        let b = lib.add(Asset::new("Bunny Ears", AssetCategory::Parts, "ears.png"));
        (lib, a, b)
    }

    #[test]
    fn test_duplicate_names_copy() {
        let (mut lib, a, _) = sample();
        let copy = lib.duplicate(a).unwrap();
        assert_ne!(copy, a);
        let copy = lib.get(copy).unwrap();
        assert_eq!(copy.name, "Happy Bunny (Copy)");
        assert_eq!(copy.tags, vec!["cute".to_string()]);
        assert_eq!(lib.len(), 3);
        assert!(lib.duplicate(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_favorite_and_move() {
        let (mut lib, a, b) = sample();
        assert_eq!(lib.toggle_favorite(b), Some(true));
        assert_eq!(lib.favorites().count(), 1);
        let miss = AssetFilter {
            search: "no such asset".into(),
            ..Default::default()
        };
        assert_eq!(lib.favorites().filter(|x| miss.matches(x)).count(), 0);
        assert_eq!(lib.favorites().filter(|x| AssetFilter::default().matches(x)).count(), 1);
        assert_eq!(lib.toggle_favorite(b), Some(false));
        assert_eq!(lib.favorites().count(), 0);

        assert!(lib.move_to_category(a, AssetCategory::Props));
        assert_eq!(lib.get(a).unwrap().category, AssetCategory::Props);
        assert!(!lib.move_to_category(Uuid::new_v4(), AssetCategory::Props));
    }

    #[test]
    fn test_delete_and_filter() {
        let (mut lib, a, _) = sample();
        let filter = AssetFilter {
            search: "bunny".into(),
            ..Default::default()
        };
        assert_eq!(lib.filtered(&filter).count(), 2);
        assert!(lib.delete(a).is_some());
        assert!(lib.delete(a).is_none());
        assert_eq!(lib.filtered(&filter).count(), 1);
    }

    #[test]
    fn test_add_tag() {
        let mut lib = Library::new();
        let before = lib.tags().len();
        let tag = lib.add_tag("spooky", "#333");
        assert_eq!(lib.tags().len(), before + 1);
        assert_eq!(lib.tags().last().unwrap().id, tag.id);
    }

    #[test]
    fn test_save_load() {
        let (lib, a, _) = sample();
        let path = std::env::temp_dir().join(format!("spritedeck_library_{}.json", Uuid::new_v4()));
        lib.save(&path).unwrap();
        let loaded = Library::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(a).unwrap().name, "Happy Bunny");
        let _ = fs::remove_file(&path);

        // Missing file is an empty library, not an error
        assert!(Library::load(&path).unwrap().is_empty());
    }
}
