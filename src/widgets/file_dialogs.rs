//! Shared file dialog helpers for widget UI.

/// File dialog filtered to decodable images.
pub fn create_image_dialog(title: &str) -> rfd::FileDialog {
    rfd::FileDialog::new()
        .add_filter("Images", crate::utils::media::IMAGE_EXTS)
        .set_title(title)
}

/// File dialog for sequence JSON files.
pub fn create_sequence_dialog(title: &str) -> rfd::FileDialog {
    rfd::FileDialog::new()
        .add_filter("SpriteDeck Sequence", &["json"])
        .set_title(title)
}
