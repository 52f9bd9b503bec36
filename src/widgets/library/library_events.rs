//! Library panel events.

use std::path::PathBuf;
use uuid::Uuid;

use crate::entities::asset::AssetCategory;

/// Append the asset's file to the sequence as a frame
#[derive(Clone, Debug)]
pub struct UseAssetEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct ToggleFavoriteEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct DuplicateAssetEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct DeleteAssetEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct MoveAssetEvent {
    pub id: Uuid,
    pub category: AssetCategory,
}

#[derive(Clone, Debug)]
pub struct RenameAssetEvent {
    pub id: Uuid,
    pub name: String,
}

/// Add a tag name to an asset
#[derive(Clone, Debug)]
pub struct TagAssetEvent {
    pub id: Uuid,
    pub tag: String,
}

/// Add picked image files to the library
#[derive(Clone, Debug)]
pub struct ImportAssetsEvent {
    pub category: AssetCategory,
    pub paths: Vec<PathBuf>,
}

/// Register a new tag definition
#[derive(Clone, Debug)]
pub struct CreateTagEvent {
    pub name: String,
    pub color: String,
}
