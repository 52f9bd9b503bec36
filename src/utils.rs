//! Utility functions and constants
//!
//! Used by: cli frame loading, library, upload storage

/// Media file type detection
pub mod media {
    use std::path::Path;

    /// Image extensions the frame cache can decode
    pub const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

    /// Check if file is a decodable image
    pub fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| IMAGE_EXTS.contains(&s.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Extension of an uploaded filename, lowercased. `bin` when absent.
    pub fn upload_extension(file_name: Option<&str>) -> String {
        file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }
}

/// Path helpers
pub mod paths {
    use anyhow::{Context, Result};
    use std::path::PathBuf;

    /// Expand a glob pattern into a sorted list of image paths
    pub fn glob_images(pattern: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in glob::glob(pattern).with_context(|| format!("Glob error for pattern {}", pattern))? {
            let path = entry.context("Glob entry error")?;
            if super::media::is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Wall-clock helpers
pub mod time {
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Milliseconds since the unix epoch (0 if the clock is before it)
    pub fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_is_image() {
        assert!(media::is_image(Path::new("a/b/frame.PNG")));
        assert!(media::is_image(Path::new("x.webp")));
        assert!(!media::is_image(Path::new("clip.mp4")));
        assert!(!media::is_image(Path::new("noext")));
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(media::upload_extension(Some("bunny.PNG")), "png");
        assert_eq!(media::upload_extension(Some("archive.tar.gz")), "gz");
        assert_eq!(media::upload_extension(Some("README")), "bin");
        assert_eq!(media::upload_extension(None), "bin");
    }

    #[test]
    fn test_glob_images_filters_and_sorts() {
        let dir = std::env::temp_dir().join(format!("spritedeck_glob_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.png", "a.png", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let pattern = format!("{}/*", dir.display());
        let found = paths::glob_images(&pattern).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01
        assert!(time::now_millis() > 1_577_836_800_000);
    }
}
