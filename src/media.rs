use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::comment::Attachment;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

impl AttachmentKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.split_once('/') {
            Some(("image", _)) => AttachmentKind::Image,
            Some(("video", _)) => AttachmentKind::Video,
            Some(("audio", _)) => AttachmentKind::Audio,
            Some(("text", _)) => AttachmentKind::Document,
            Some(("application", sub))
                if sub == "pdf"
                    || sub.starts_with("vnd.openxmlformats")
                    || sub.starts_with("vnd.ms-")
                    || sub == "msword"
                    || sub == "rtf" =>
            {
                AttachmentKind::Document
            }
            _ => AttachmentKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
            AttachmentKind::Audio => "audio",
            AttachmentKind::Document => "document",
            AttachmentKind::Other => "file",
        }
    }

    pub fn has_inline_preview(&self) -> bool {
        matches!(self, AttachmentKind::Image | AttachmentKind::Video)
    }
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime)
    }

    pub fn preview_label(&self) -> String {
        format!("[{}] {}", self.kind().label(), self.name)
    }
}

pub fn attachment_from_path(path: &Path) -> Result<Attachment> {
    let absolute = fs::canonicalize(path)
        .with_context(|| format!("media: resolve attachment {}", path.display()))?;
    let metadata = fs::metadata(&absolute)
        .with_context(|| format!("media: stat attachment {}", absolute.display()))?;
    if !metadata.is_file() {
        return Err(anyhow!("media: {} is not a file", absolute.display()));
    }

    let name = absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let url = Url::from_file_path(&absolute)
        .map_err(|_| anyhow!("media: cannot build file URL for {}", absolute.display()))?;
    let mime = tree_magic_mini::from_filepath(&absolute)
        .unwrap_or(FALLBACK_MIME)
        .to_string();

    Ok(Attachment {
        url: url.to_string(),
        mime,
        name,
    })
}
