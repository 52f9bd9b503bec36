//! Library asset - an image (or image pack) the user can drop into a sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::frame::Frame;
use crate::utils::time::now_millis;

/// Library shelf an asset lives on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Characters,
    Parts,
    Sequences,
    Props,
    #[default]
    Custom,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 5] = [
        AssetCategory::Characters,
        AssetCategory::Parts,
        AssetCategory::Sequences,
        AssetCategory::Props,
        AssetCategory::Custom,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AssetCategory::Characters => "Characters",
            AssetCategory::Parts => "Parts",
            AssetCategory::Sequences => "Sequences",
            AssetCategory::Props => "Props",
            AssetCategory::Custom => "Custom",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named tag with a display color (CSS-style color string)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetTag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl AssetTag {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: color.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub category: AssetCategory,
    pub thumbnail_url: String,
    pub file_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u32>,
    /// Total duration for sequence assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Asset {
    /// New asset using the file itself as thumbnail.
    pub fn new(name: impl Into<String>, category: AssetCategory, file_url: impl Into<String>) -> Self {
        let file_url = file_url.into();
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
            thumbnail_url: file_url.clone(),
            file_url,
            tags: Vec::new(),
            created_at_ms: now,
            updated_at_ms: now,
            favorite: false,
            frame_count: None,
            duration_ms: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at_ms = now_millis().max(self.created_at_ms);
    }

    /// Frame showing this asset's file for `duration_ms`.
    pub fn to_frame(&self, duration_ms: i64) -> Frame {
        Frame::new(self.file_url.clone(), duration_ms)
    }
}

/// Partial update for [`Asset`]. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct AssetUpdate {
    pub name: Option<String>,
    pub category: Option<AssetCategory>,
    pub tags: Option<Vec<String>>,
    pub favorite: Option<bool>,
}

impl AssetUpdate {
    pub(crate) fn apply(self, asset: &mut Asset) {
        if let Some(name) = self.name {
            asset.name = name;
        }
        if let Some(category) = self.category {
            asset.category = category;
        }
        if let Some(tags) = self.tags {
            asset.tags = tags;
        }
        if let Some(favorite) = self.favorite {
            asset.favorite = favorite;
        }
        asset.touch();
    }
}

/// Library view filter. Empty/None fields match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetFilter {
    pub category: Option<AssetCategory>,
    /// Asset matches if it carries any of these
    pub tags: Vec<String>,
    /// Case-insensitive substring of the name
    pub search: String,
}

impl AssetFilter {
    pub fn matches(&self, asset: &Asset) -> bool {
        if let Some(category) = self.category
            && asset.category != category
        {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| asset.has_tag(t)) {
            return false;
        }
        let query = self.search.trim();
        if !query.is_empty() && !asset.name.to_lowercase().contains(&query.to_lowercase()) {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.tags.is_empty() && self.search.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&AssetCategory::Characters).unwrap();
        assert_eq!(json, "\"characters\"");
        let back: AssetCategory = serde_json::from_str("\"props\"").unwrap();
        assert_eq!(back, AssetCategory::Props);
    }

    #[test]
    fn test_filter_category_tags_search() {
        let bunny = Asset::new("Happy Bunny", AssetCategory::Characters, "bunny.png")
            .with_tags(["cute", "main"]);
        let ears = Asset::new("Bunny Ears", AssetCategory::Parts, "ears.png").with_tags(["accessory"]);

        let all = AssetFilter::default();
        assert!(all.is_empty());
        assert!(all.matches(&bunny) && all.matches(&ears));

        let chars = AssetFilter {
            category: Some(AssetCategory::Characters),
            ..Default::default()
        };
        assert!(chars.matches(&bunny));
        assert!(!chars.matches(&ears));

        let tagged = AssetFilter {
            tags: vec!["accessory".into(), "missing".into()],
            ..Default::default()
        };
        assert!(!tagged.matches(&bunny));
        assert!(tagged.matches(&ears));

        let search = AssetFilter {
            search: "  bUNNY ".into(),
            ..Default::default()
        };
        assert!(search.matches(&bunny) && search.matches(&ears));
    }

    #[test]
    fn test_update_touches() {
        let mut asset = Asset::new("a", AssetCategory::Props, "a.png");
        asset.updated_at_ms = 0;
        AssetUpdate {
            favorite: Some(true),
            ..Default::default()
        }
        .apply(&mut asset);
        assert!(asset.favorite);
        assert_eq!(asset.name, "a");
        assert!(asset.updated_at_ms >= asset.created_at_ms);
    }

    #[test]
    fn test_to_frame_uses_file_url() {
        let asset = Asset::new("wave", AssetCategory::Sequences, "/tmp/wave.png");
        let frame = asset.to_frame(5000);
        assert_eq!(frame.image_url, "/tmp/wave.png");
        assert_eq!(frame.duration_ms(), 1000);
    }
}
