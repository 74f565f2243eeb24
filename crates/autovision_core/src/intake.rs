//! Selection of the photo to analyze.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// An accepted image, ready for preview and upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSelection {
    pub file_name: String,
    /// Declared content type, always `image/...`.
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

/// Whether a photo is currently selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Empty,
    Preview(ImageSelection),
}

impl SelectionState {
    pub fn image(&self) -> Option<&ImageSelection> {
        match self {
            SelectionState::Empty => None,
            SelectionState::Preview(img) => Some(img),
        }
    }
}

/// Content type derived from a file extension, for sources that do not
/// declare one.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Accept a candidate only when its declared content type is `image/*`.
///
/// Rejections are silent; the caller simply keeps its previous state.
pub fn accept(file_name: &str, declared_mime: Option<&str>, bytes: Arc<[u8]>) -> Option<ImageSelection> {
    let mime = declared_mime.filter(|m| !m.is_empty())?;
    if !mime.starts_with("image/") {
        tracing::debug!("ignoring {file_name}: content type {mime}");
        return None;
    }
    Some(ImageSelection {
        file_name: file_name.to_string(),
        mime: mime.to_string(),
        bytes,
    })
}

/// Read a file picked from disk or dropped onto the window.
///
/// `declared_mime` is what the platform reported, if anything; otherwise
/// the extension decides. Returns `Ok(None)` for non-image files without
/// reading them.
pub fn load_path(path: &Path, declared_mime: Option<&str>) -> Result<Option<ImageSelection>> {
    let mime = declared_mime
        .filter(|m| !m.is_empty())
        .or_else(|| mime_for_path(path));
    if !mime.is_some_and(|m| m.starts_with("image/")) {
        tracing::debug!("ignoring {}: not an image", path.display());
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(accept(&file_name, mime, bytes.into()))
}
