//! REST API server: remote player control and asset uploads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐       mpsc::channel        ┌──────────────────────┐
//! │   API Server Thread     │  ───── ApiCommand ──────▶  │   Main Thread        │
//! │   (rouille HTTP)        │                            │   (egui loop)        │
//! │                         │                            │                      │
//! │  POST /api/player/play  │  ──▶ ApiCommand::Play ──▶  │  player.play()       │
//! │  POST /api/assets/upload│  ──▶ AssetUploaded ─────▶  │  library.add()       │
//! └─────────────────────────┘                            └──────────────────────┘
//!          │                                                      │
//!          │  Arc<SharedApiState>                                 │
//!          │◀──────────── read snapshots ─────────────────────────│
//!          │                                             updates each frame
//! ```
//!
//! # Endpoints
//!
//! | Method | Path                      | Description                       |
//! |--------|---------------------------|-----------------------------------|
//! | GET    | `/api/health`             | Health check                      |
//! | GET    | `/api/player`             | Player state                      |
//! | POST   | `/api/player/play`        | Start playback                    |
//! | POST   | `/api/player/pause`       | Pause playback                    |
//! | POST   | `/api/player/stop`        | Pause + rewind                    |
//! | POST   | `/api/player/next`        | Step forward                      |
//! | POST   | `/api/player/prev`        | Step backward                     |
//! | POST   | `/api/player/toggle-loop` | Toggle loop mode                  |
//! | POST   | `/api/player/frame/{n}`   | Select frame n                    |
//! | POST   | `/api/assets/upload`      | Multipart upload (bearer auth)    |
//! | GET    | `/api/asset-packs`        | Caller's asset packs (bearer auth)|
//! | GET    | `/storage/{user}/{file}`  | Stored upload                     |

mod api;
pub mod upload;

pub use api::{ApiCommand, ApiServer, PlayerSnapshot, SharedApiState};
pub use upload::UploadService;
