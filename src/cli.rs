use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Images: image 0.25 (png, jpeg, gif, webp, bmp)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Frame sequencer for VTuber sprites
#[derive(Parser, Debug, Default)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Image files to append as frames, in order
    #[arg(value_name = "FILE")]
    pub file_paths: Vec<PathBuf>,

    /// Additional frame files (can be specified multiple times)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Glob pattern for frame files, sorted by name (e.g. "blink_*.png")
    #[arg(short = 'g', long = "glob", value_name = "PATTERN")]
    pub glob: Option<String>,

    /// Open a saved sequence (JSON)
    #[arg(short = 's', long = "sequence", value_name = "SEQUENCE")]
    pub sequence: Option<PathBuf>,

    /// Auto-play on startup
    #[arg(short = 'a', long = "autoplay")]
    pub autoplay: bool,

    /// Enable looping (default: true)
    #[arg(short = 'o', long = "loop", value_name = "0|1", default_value = "1")]
    pub loop_playback: u8,

    /// Duration for frames loaded from the command line, ms (clamped to 50..1000)
    #[arg(short = 'd', long = "duration", value_name = "MS")]
    pub duration_ms: Option<i64>,

    /// Start the REST API server even if disabled in settings
    #[arg(long = "serve")]
    pub serve: bool,

    /// REST API port (overrides settings)
    #[arg(long = "port", value_name = "N")]
    pub port: Option<u16>,

    /// Directory for uploaded files (overrides settings)
    #[arg(long = "storage-dir", value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Enable debug logging to file (default: spritedeck.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// All explicitly listed frame files (positional first, then `-f`).
    pub fn frame_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.file_paths.iter().chain(self.files.iter())
    }

    pub fn looping(&self) -> bool {
        self.loop_playback != 0
    }
}
