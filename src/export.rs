use anyhow::{Context, Result};
use serde::Serialize;

use crate::comment::Comment;
use crate::timecode;
use crate::view::{number_label, CommentView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Csv,
    Text,
    Json,
}

impl Format {
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Format::Text,
            "json" => Format::Json,
            _ => Format::Csv,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CsvRecord {
    pub number: String,
    pub timecode: String,
    pub author: String,
    pub created_at: String,
    pub text: String,
    pub attachments: String,
    pub has_drawing: bool,
    pub reply_to: String,
}

impl CsvRecord {
    fn new(comment: &Comment, number: Option<usize>, reply_to: Option<&str>) -> Self {
        let attachments = comment
            .attachments
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        CsvRecord {
            number: if reply_to.is_some() {
                String::new()
            } else {
                number_label(number)
            },
            timecode: timecode::format(comment.timestamp),
            author: comment.author.clone(),
            created_at: comment.created_at.to_rfc3339(),
            text: comment.text.clone(),
            attachments,
            has_drawing: comment.has_drawing,
            reply_to: reply_to.unwrap_or_default().to_string(),
        }
    }
}

pub fn to_csv(view: &CommentView<'_>, include_replies: bool) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for thread in &view.threads {
        let parent = thread.comment;
        wtr.serialize(CsvRecord::new(parent.comment, parent.number, None))
            .context("export: write comment row")?;
        if !include_replies {
            continue;
        }
        let label = parent.label();
        for reply in &thread.replies {
            wtr.serialize(CsvRecord::new(reply, None, Some(label.as_str())))
                .context("export: write reply row")?;
        }
    }
    wtr.flush().context("export: flush csv")?;
    let bytes = wtr.into_inner().context("export: finish csv")?;
    String::from_utf8(bytes).context("export: csv is not utf-8")
}

pub fn to_plain_text(view: &CommentView<'_>, include_replies: bool) -> String {
    let mut out = String::new();
    for thread in &view.threads {
        let parent = thread.comment;
        out.push_str(&format!(
            "{} [{}] {}: {}\n",
            parent.label(),
            timecode::format(parent.comment.timestamp),
            parent.comment.author,
            parent.comment.text
        ));
        if !include_replies {
            continue;
        }
        for reply in &thread.replies {
            out.push_str(&format!("    ↳ {}: {}\n", reply.author, reply.text));
        }
    }
    out
}

pub fn to_json(view: &CommentView<'_>, include_replies: bool) -> Result<String> {
    let mut comments: Vec<&Comment> = Vec::new();
    for thread in &view.threads {
        comments.push(thread.comment.comment);
        if include_replies {
            comments.extend(thread.replies.iter().copied());
        }
    }
    serde_json::to_string_pretty(&comments).context("export: encode json")
}

pub fn render(view: &CommentView<'_>, format: Format, include_replies: bool) -> Result<String> {
    match format {
        Format::Csv => to_csv(view, include_replies),
        Format::Text => Ok(to_plain_text(view, include_replies)),
        Format::Json => to_json(view, include_replies),
    }
}

pub fn copy_to_clipboard(contents: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("export: open clipboard")?;
    clipboard
        .set_text(contents.to_string())
        .context("export: write clipboard")
}
