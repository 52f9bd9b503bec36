//! REST API implementation using rouille.
//!
//! - [`ApiServer`] - HTTP server runner, spawns background thread
//! - [`ApiCommand`] - commands sent to the UI thread (Play, Pause, SelectFrame, ...)
//! - [`SharedApiState`] - player snapshot updated by the UI thread every frame
//!
//! GET handlers only read `SharedApiState`; POST player handlers only send
//! commands. Uploads run on the HTTP thread through [`UploadService`] and the
//! resulting pack is forwarded to the UI as [`ApiCommand::AssetUploaded`].
//! CORS headers are added to every response.

use log::{debug, error, info, warn};
use rouille::input::post::BufferedFile;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock, mpsc};
use std::thread;

use super::upload::{AssetPack, UploadRequest, UploadService, UploadedFile};

/// Commands sent from API handlers to main thread
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCommand {
    Play,
    Pause,
    /// Pause and rewind to frame 0
    Stop,
    Next,
    Prev,
    ToggleLoop,
    SelectFrame(usize),
    /// A pack was stored; add it to the library
    AssetUploaded(AssetPack),
}

/// Player state snapshot for API responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub sequence_name: String,
    pub current_frame: usize,
    pub frame_count: usize,
    pub playing: bool,
    pub looping: bool,
    pub total_duration_ms: u64,
}

impl PlayerSnapshot {
    pub fn from_player(player: &crate::core::player::Player) -> Self {
        let seq = player.sequence();
        Self {
            sequence_name: seq.name.clone(),
            current_frame: player.current_index(),
            frame_count: seq.len(),
            playing: player.is_playing(),
            looping: player.is_looping(),
            total_duration_ms: seq.total_duration_ms(),
        }
    }
}

/// Shared state readable by API handlers (updated by main thread)
#[derive(Debug, Default)]
pub struct SharedApiState {
    pub player: RwLock<PlayerSnapshot>,
}

impl SharedApiState {
    pub fn publish(&self, snapshot: PlayerSnapshot) {
        let mut player = self.player.write().unwrap_or_else(|e| e.into_inner());
        if *player != snapshot {
            *player = snapshot;
        }
    }

    pub fn player(&self) -> PlayerSnapshot {
        self.player.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Generic API response
#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn ok_msg(msg: &str) -> Self {
        Self {
            success: true,
            message: Some(msg.to_string()),
        }
    }
}

/// Error body: `{"error": "..."}`
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(msg: impl Into<String>, status: u16) -> Response {
    Response::json(&ErrorResponse { error: msg.into() }).with_status_code(status)
}

fn with_cors(response: Response) -> Response {
    response
        .with_additional_header("Access-Control-Allow-Origin", "*")
        .with_additional_header("Access-Control-Allow-Methods", "POST, GET, OPTIONS")
        .with_additional_header("Access-Control-Allow-Headers", "authorization, content-type")
}

/// `Authorization: Bearer <token>` value
fn bearer_token(request: &Request) -> Option<String> {
    let header = request.header("Authorization")?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// REST API server
pub struct ApiServer {
    port: u16,
    state: Arc<SharedApiState>,
    command_tx: mpsc::Sender<ApiCommand>,
    uploads: Option<Arc<UploadService>>,
    storage_root: Option<PathBuf>,
}

impl ApiServer {
    /// Build a server and the command receiver for the main thread.
    pub fn new(port: u16, state: Arc<SharedApiState>) -> (Self, mpsc::Receiver<ApiCommand>) {
        let (tx, rx) = mpsc::channel();
        let server = ApiServer {
            port,
            state,
            command_tx: tx,
            uploads: None,
            storage_root: None,
        };
        (server, rx)
    }

    /// Enable upload routes and `/storage/...` file serving.
    pub fn with_uploads(mut self, uploads: Arc<UploadService>, storage_root: PathBuf) -> Self {
        self.uploads = Some(uploads);
        self.storage_root = Some(storage_root);
        self
    }

    /// Run the server on a background thread.
    pub fn start(self) {
        let spawned = thread::Builder::new()
            .name("spritedeck-api".into())
            .spawn(move || self.run());
        if let Err(e) = spawned {
            error!("Failed to spawn API server thread: {}", e);
        }
    }

    fn run(self) {
        let addr = format!("0.0.0.0:{}", self.port);
        info!("API server starting on http://{}", addr);

        match rouille::Server::new(&addr, move |request| self.handle_request(request)) {
            Ok(server) => server.run(),
            Err(e) => error!("API server failed to bind {}: {}", addr, e),
        }
    }

    pub fn handle_request(&self, request: &Request) -> Response {
        if request.method() == "OPTIONS" {
            return with_cors(Response::empty_204());
        }
        debug!("API {} {}", request.method(), request.url());
        with_cors(self.route(request))
    }

    fn route(&self, request: &Request) -> Response {
        // Paths with parameters handled manually
        let path = request.url();
        if request.method() == "POST"
            && let Some(frame_str) = path.strip_prefix("/api/player/frame/")
        {
            return match frame_str.parse::<usize>() {
                Ok(frame) => self.send_command(ApiCommand::SelectFrame(frame)),
                Err(_) => error_response("Invalid frame number", 400),
            };
        }
        if request.method() == "GET" && path.starts_with("/storage/") {
            return self.serve_storage(request);
        }

        rouille::router!(request,
            (GET) ["/api/health"] => {
                Response::json(&ApiResponse::ok_msg("spritedeck API server"))
            },
            (GET) ["/api/player"] => {
                Response::json(&self.state.player())
            },

            (POST) ["/api/player/play"] => { self.send_command(ApiCommand::Play) },
            (POST) ["/api/player/pause"] => { self.send_command(ApiCommand::Pause) },
            (POST) ["/api/player/stop"] => { self.send_command(ApiCommand::Stop) },
            (POST) ["/api/player/next"] => { self.send_command(ApiCommand::Next) },
            (POST) ["/api/player/prev"] => { self.send_command(ApiCommand::Prev) },
            (POST) ["/api/player/toggle-loop"] => { self.send_command(ApiCommand::ToggleLoop) },

            (POST) ["/api/assets/upload"] => { self.handle_upload(request) },
            (GET) ["/api/asset-packs"] => { self.handle_list_packs(request) },

            _ => { error_response("Not found", 404) }
        )
    }

    fn send_command(&self, cmd: ApiCommand) -> Response {
        match self.command_tx.send(cmd) {
            Ok(_) => Response::json(&ApiResponse::ok()),
            Err(e) => error_response(format!("Failed to send command: {}", e), 500),
        }
    }

    fn upload_request(request: &Request) -> UploadRequest {
        let bearer_token = bearer_token(request);
        let form = rouille::post_input!(request, {
            file: Option<BufferedFile>,
            name: Option<String>,
            description: Option<String>,
        });
        match form {
            Ok(form) => UploadRequest {
                bearer_token,
                file: form.file.map(|f| UploadedFile {
                    file_name: f.filename,
                    content_type: Some(f.mime),
                    data: f.data,
                }),
                name: form.name,
                description: form.description,
            },
            Err(e) => {
                // Auth is still checked first; an unreadable form is just "missing fields"
                debug!("Upload form not parsed: {}", e);
                UploadRequest {
                    bearer_token,
                    ..Default::default()
                }
            }
        }
    }

    fn handle_upload(&self, request: &Request) -> Response {
        let Some(uploads) = &self.uploads else {
            return error_response("Uploads are disabled", 500);
        };
        match uploads.handle(Self::upload_request(request)) {
            Ok(outcome) => {
                if self
                    .command_tx
                    .send(ApiCommand::AssetUploaded(outcome.asset_pack.clone()))
                    .is_err()
                {
                    warn!("UI not listening, asset pack {} not added to library", outcome.asset_pack.id);
                }
                Response::json(&outcome)
            }
            Err(e) => {
                error!("Error in upload: {:#}", e);
                error_response(e.to_string(), 500)
            }
        }
    }

    fn handle_list_packs(&self, request: &Request) -> Response {
        let Some(uploads) = &self.uploads else {
            return error_response("Uploads are disabled", 500);
        };
        match uploads.list_packs(bearer_token(request).as_deref()) {
            Ok(packs) => Response::json(&packs),
            Err(e) => error_response(e.to_string(), 500),
        }
    }

    fn serve_storage(&self, request: &Request) -> Response {
        let (Some(root), Some(sub)) = (&self.storage_root, request.remove_prefix("/storage")) else {
            return error_response("Not found", 404);
        };
        let response = rouille::match_assets(&sub, root);
        if response.is_success() {
            response
        } else {
            error_response("Not found", 404)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::upload::{JsonAssetPackRepo, LocalBlobStore, LogOnlyTrigger, TokenAuthenticator};
    use std::io::Read;

    fn body_json(response: Response) -> serde_json::Value {
        let (mut reader, _) = response.data.into_reader_and_size();
        let mut body = String::new();
        reader.read_to_string(&mut body).unwrap();
        serde_json::from_str(&body).unwrap()
    }

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_ref())
    }

    fn server_with_uploads() -> (ApiServer, mpsc::Receiver<ApiCommand>, PathBuf) {
        let root = std::env::temp_dir().join(format!("spritedeck_api_{}", uuid::Uuid::new_v4()));
        let uploads = UploadService::new(
            Arc::new(TokenAuthenticator::parse("tok:alice")),
            Arc::new(LocalBlobStore::new(&root)),
            Arc::new(JsonAssetPackRepo::in_memory()),
            Arc::new(LogOnlyTrigger),
        );
        let (server, rx) = ApiServer::new(0, Arc::new(SharedApiState::default()));
        (server.with_uploads(Arc::new(uploads), root.clone()), rx, root)
    }

    fn multipart(token: Option<&str>, with_file: bool) -> Request {
        let boundary = "XBOUNDARYX";
        let mut body = String::new();
        if with_file {
            body.push_str(&format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"bunny.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n",
                b = boundary
            ));
        }
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nBunny\r\n--{b}--\r\n",
            b = boundary
        ));
        let mut headers = vec![(
            "Content-Type".to_owned(),
            format!("multipart/form-data; boundary={}", boundary),
        )];
        if let Some(token) = token {
            headers.push(("Authorization".to_owned(), format!("Bearer {}", token)));
        }
        Request::fake_http("POST", "/api/assets/upload", headers, body.into_bytes())
    }

    #[test]
    fn test_player_commands() {
        let (server, rx) = ApiServer::new(0, Arc::new(SharedApiState::default()));
        for (url, expected) in [
            ("/api/player/play", ApiCommand::Play),
            ("/api/player/next", ApiCommand::Next),
            ("/api/player/toggle-loop", ApiCommand::ToggleLoop),
            ("/api/player/frame/7", ApiCommand::SelectFrame(7)),
        ] {
            let response = server.handle_request(&Request::fake_http("POST", url, vec![], vec![]));
            assert_eq!(response.status_code, 200, "{}", url);
            assert_eq!(rx.try_recv().unwrap(), expected);
        }

        let bad = server.handle_request(&Request::fake_http("POST", "/api/player/frame/-1", vec![], vec![]));
        assert_eq!(bad.status_code, 400);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_player_snapshot_and_cors() {
        let state = Arc::new(SharedApiState::default());
        state.publish(PlayerSnapshot {
            frame_count: 3,
            current_frame: 1,
            playing: true,
            ..Default::default()
        });
        let (server, _rx) = ApiServer::new(0, Arc::clone(&state));
        let response = server.handle_request(&Request::fake_http("GET", "/api/player", vec![], vec![]));
        assert_eq!(header(&response, "Access-Control-Allow-Origin"), Some("*"));
        let json = body_json(response);
        assert_eq!(json["current_frame"], 1);
        assert_eq!(json["playing"], true);

        let preflight = server.handle_request(&Request::fake_http("OPTIONS", "/api/assets/upload", vec![], vec![]));
        assert_eq!(preflight.status_code, 204);
        assert!(header(&preflight, "Access-Control-Allow-Headers").is_some());

        let missing = server.handle_request(&Request::fake_http("GET", "/nope", vec![], vec![]));
        assert_eq!(missing.status_code, 404);
    }

    #[test]
    fn test_upload_requires_auth() {
        let (server, rx, root) = server_with_uploads();
        let response = server.handle_request(&multipart(None, true));
        assert_eq!(response.status_code, 500);
        assert_eq!(body_json(response)["error"], "User not authenticated");
        assert!(rx.try_recv().is_err());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_upload_missing_file() {
        let (server, _rx, root) = server_with_uploads();
        let response = server.handle_request(&multipart(Some("tok"), false));
        assert_eq!(response.status_code, 500);
        assert_eq!(body_json(response)["error"], "Missing required fields: file and name");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_upload_success_and_serving() {
        let (server, rx, root) = server_with_uploads();
        let response = server.handle_request(&multipart(Some("tok"), true));
        assert_eq!(response.status_code, 200);
        let json = body_json(response);
        assert_eq!(json["success"], true);
        assert_eq!(json["assetPack"]["status"], "pending");
        assert_eq!(json["assetPack"]["name"], "Bunny");

        let Ok(ApiCommand::AssetUploaded(pack)) = rx.try_recv() else {
            panic!("expected AssetUploaded");
        };
        let stored = PathBuf::from(&pack.original_image_url);
        let rel = stored.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/");
        let served = server.handle_request(&Request::fake_http("GET", format!("/storage/{}", rel), vec![], vec![]));
        assert_eq!(served.status_code, 200);

        let list = server.handle_request(&Request::fake_http(
            "GET",
            "/api/asset-packs",
            vec![("Authorization".to_owned(), "Bearer tok".to_owned())],
            vec![],
        ));
        assert_eq!(body_json(list).as_array().map(|a| a.len()), Some(1));
        let _ = std::fs::remove_dir_all(&root);
    }
}
