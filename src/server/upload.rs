//! Asset upload service.
//!
//! Flow for one upload:
//! 1. resolve the caller from the bearer token
//! 2. require a file and a non-empty name
//! 3. store bytes under `<user>/<unix_millis>.<ext>` (never overwriting)
//! 4. insert a `pending` asset-pack record
//! 5. hand `{ assetPackId, imageUrl }` to the processing trigger in the
//!    background; its failures are logged only
//!
//! Every failure is an `anyhow::Error`; the HTTP layer turns it into a
//! generic `{"error": ...}` payload. External systems sit behind the
//! [`Authenticator`], [`BlobStore`], [`AssetPackRepo`] and
//! [`ProcessingTrigger`] traits.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::core::workers::Workers;
use crate::utils::media::upload_extension;
use crate::utils::time::now_millis;

pub const TOKENS_ENV: &str = "SPRITEDECK_API_TOKENS";
pub const UPLOAD_MESSAGE: &str = "Upload successful, AI pipeline started";
pub const ERR_NOT_AUTHENTICATED: &str = "User not authenticated";
pub const ERR_MISSING_FIELDS: &str = "Missing required fields: file and name";

// === Request / records ===

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Parsed upload form plus credentials
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub bearer_token: Option<String>,
    pub file: Option<UploadedFile>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetPackStatus {
    #[default]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPack {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub original_image_url: String,
    pub thumbnail_url: String,
    pub status: AssetPackStatus,
    pub created_at: u64,
}

/// Fields the caller provides; the repo assigns id, status and timestamp
#[derive(Debug, Clone)]
pub struct NewAssetPack {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: String,
}

/// Payload sent to the processing function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    pub asset_pack_id: Uuid,
    pub image_url: String,
}

/// Successful upload response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub success: bool,
    pub asset_pack: AssetPack,
    pub message: String,
}

// === Seams ===

pub trait Authenticator: Send + Sync {
    /// User id for a bearer token, `None` if unknown.
    fn authenticate(&self, token: Option<&str>) -> Option<String>;
}

pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`. Fails if the key already exists.
    fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<()>;
    fn public_url(&self, key: &str) -> String;
}

pub trait AssetPackRepo: Send + Sync {
    fn insert(&self, pack: NewAssetPack) -> Result<AssetPack>;
    fn list_for_user(&self, user_id: &str) -> Result<Vec<AssetPack>>;
}

pub trait ProcessingTrigger: Send + Sync {
    fn trigger(&self, job: &ProcessingJob) -> Result<()>;
}

// === Authenticator ===

/// Static token table, `token:user` pairs
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl TokenAuthenticator {
    /// Parse `"tok1:alice,tok2:bob"`. Malformed entries are skipped.
    pub fn parse(list: &str) -> Self {
        let tokens = list
            .split(',')
            .filter_map(|pair| {
                let (token, user) = pair.split_once(':')?;
                let (token, user) = (token.trim(), user.trim());
                (!token.is_empty() && !user.is_empty()).then(|| (token.to_string(), user.to_string()))
            })
            .collect();
        Self { tokens }
    }

    pub fn from_env() -> Self {
        let auth = Self::parse(&std::env::var(TOKENS_ENV).unwrap_or_default());
        if auth.is_empty() {
            log::warn!("{} not set, all uploads will be rejected", TOKENS_ENV);
        }
        auth
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, token: Option<&str>) -> Option<String> {
        self.tokens.get(token?.trim()).cloned()
    }
}

// === Blob store ===

/// Files on local disk under `root`
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        let safe = rel
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        if !safe || key.is_empty() {
            bail!("Invalid storage key: {}", key);
        }
        Ok(self.root.join(rel))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create storage dir: {}", parent.display()))?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Failed to store {}", key))?;
        file.write_all(data).with_context(|| format!("Failed to write {}", key))?;
        debug!("Stored {} ({} bytes, {})", key, data.len(), content_type.unwrap_or("unknown type"));
        Ok(())
    }

    /// Local path, so stored files can be used directly as frame images.
    fn public_url(&self, key: &str) -> String {
        self.root.join(key).to_string_lossy().into_owned()
    }
}

// === Asset-pack repo ===

/// Asset packs in memory, optionally mirrored to a JSON file
#[derive(Debug, Default)]
pub struct JsonAssetPackRepo {
    path: Option<PathBuf>,
    packs: Mutex<Vec<AssetPack>>,
}

impl JsonAssetPackRepo {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load existing records from `path` (missing file = empty).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let packs = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Read asset packs: {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("Parse asset packs: {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self {
            path: Some(path),
            packs: Mutex::new(packs),
        })
    }

    fn persist(&self, packs: &[AssetPack]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(packs).context("Serialize asset packs")?;
        fs::write(path, json).with_context(|| format!("Write asset packs: {}", path.display()))
    }
}

impl AssetPackRepo for JsonAssetPackRepo {
    fn insert(&self, new: NewAssetPack) -> Result<AssetPack> {
        let pack = AssetPack {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name,
            description: new.description,
            thumbnail_url: new.image_url.clone(),
            original_image_url: new.image_url,
            status: AssetPackStatus::Pending,
            created_at: now_millis(),
        };
        let mut packs = self.packs.lock().unwrap_or_else(|e| e.into_inner());
        packs.push(pack.clone());
        if let Err(e) = self.persist(&packs) {
            packs.pop();
            return Err(e);
        }
        Ok(pack)
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<AssetPack>> {
        let packs = self.packs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(packs.iter().filter(|p| p.user_id == user_id).cloned().collect())
    }
}

// === Processing triggers ===

/// POSTs the job as JSON to a webhook
pub struct WebhookTrigger {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookTrigger {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { url: url.into(), client })
    }
}

impl ProcessingTrigger for WebhookTrigger {
    fn trigger(&self, job: &ProcessingJob) -> Result<()> {
        self.client
            .post(&self.url)
            .json(job)
            .send()
            .with_context(|| format!("Processing request to {} failed", self.url))?
            .error_for_status()
            .context("Processing endpoint returned an error")?;
        Ok(())
    }
}

/// Used when no processing endpoint is configured
#[derive(Debug, Default)]
pub struct LogOnlyTrigger;

impl ProcessingTrigger for LogOnlyTrigger {
    fn trigger(&self, job: &ProcessingJob) -> Result<()> {
        info!("No processing endpoint configured, asset pack {} stays pending", job.asset_pack_id);
        Ok(())
    }
}

// === Service ===

pub struct UploadService {
    auth: Arc<dyn Authenticator>,
    blobs: Arc<dyn BlobStore>,
    repo: Arc<dyn AssetPackRepo>,
    processing: Arc<dyn ProcessingTrigger>,
    /// Own pool for processing calls (inline when `None`), apart from frame decoding
    processing_pool: Option<Workers>,
}

impl UploadService {
    pub fn new(
        auth: Arc<dyn Authenticator>,
        blobs: Arc<dyn BlobStore>,
        repo: Arc<dyn AssetPackRepo>,
        processing: Arc<dyn ProcessingTrigger>,
    ) -> Self {
        Self {
            auth,
            blobs,
            repo,
            processing,
            processing_pool: None,
        }
    }

    /// Run processing triggers on `threads` dedicated threads.
    pub fn with_processing_threads(mut self, threads: usize) -> Self {
        self.processing_pool = Some(Workers::new(threads));
        self
    }

    /// Resolve caller, or fail with the generic auth error.
    pub fn authenticate(&self, token: Option<&str>) -> Result<String> {
        self.auth
            .authenticate(token)
            .ok_or_else(|| anyhow!(ERR_NOT_AUTHENTICATED))
    }

    pub fn handle(&self, request: UploadRequest) -> Result<UploadOutcome> {
        let user_id = self.authenticate(request.bearer_token.as_deref())?;

        let name = request.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let (Some(file), Some(name)) = (request.file, name) else {
            bail!(ERR_MISSING_FIELDS);
        };

        info!("Uploading asset '{}' for user {}", name, user_id);

        let ext = upload_extension(file.file_name.as_deref());
        let key = format!("{}/{}.{}", user_id, now_millis(), ext);
        self.blobs.put(&key, &file.data, file.content_type.as_deref())?;
        let image_url = self.blobs.public_url(&key);
        debug!("File uploaded: {}", image_url);

        let description = request.description.filter(|d| !d.is_empty());
        let pack = self.repo.insert(NewAssetPack {
            user_id,
            name,
            description,
            image_url: image_url.clone(),
        })?;
        info!("Asset pack created: {}", pack.id);

        self.dispatch_processing(ProcessingJob {
            asset_pack_id: pack.id,
            image_url,
        });

        Ok(UploadOutcome {
            success: true,
            asset_pack: pack,
            message: UPLOAD_MESSAGE.to_string(),
        })
    }

    pub fn list_packs(&self, token: Option<&str>) -> Result<Vec<AssetPack>> {
        let user_id = self.authenticate(token)?;
        self.repo.list_for_user(&user_id)
    }

    fn dispatch_processing(&self, job: ProcessingJob) {
        let processing = Arc::clone(&self.processing);
        let run = move || {
            if let Err(e) = processing.trigger(&job) {
                error!("Pipeline trigger error for {}: {:#}", job.asset_pack_id, e);
            }
        };
        match &self.processing_pool {
            Some(pool) => pool.execute(run),
            None => run(),
        }
    }
}
