use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, warn};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::UnicodeWidthStr;

use crate::annotation::{Sketch, Stroke};
use crate::comment::{Comment, CommentId, NewComment};
use crate::config::{self, Config, ViewConfig};
use crate::data::CommentStore;
use crate::draft::Draft;
use crate::export::{self, Format};
use crate::media;
use crate::player::{self, ManualPlayhead};
use crate::query::{AdvancedFilters, Query, SortOption, TypeFilter};
use crate::storage;
use crate::timecode;
use crate::view::{self, CommentView, TypeCounts};

const LIST_WIDTH: usize = 88;
const BODY_INDENT: &str = "      ";

#[derive(Debug, Parser)]
#[command(name = "review-notes", version, about = "Timestamped review comments for video.")]
pub struct Cli {
    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Comment database to use instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show comments and their replies
    List(QueryArgs),
    /// Add a comment at a timecode (use "general" for an unanchored comment)
    Add {
        timecode: String,
        text: String,
        #[arg(long)]
        author: Option<String>,
        /// File to attach; may be repeated
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
        /// JSON file with drawing strokes made on the frame
        #[arg(long)]
        sketch: Option<PathBuf>,
    },
    /// Reply to a top-level comment
    Reply {
        parent: String,
        text: String,
        #[arg(long)]
        author: Option<String>,
    },
    /// Delete a comment and its replies
    Delete { id: String },
    /// Print where the playhead lands when a comment is selected
    Seek { id: String },
    /// Count top-level comments per type
    Counts,
    /// Export the visible comments
    Export {
        #[command(flatten)]
        query: QueryArgs,
        /// csv, text or json
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Copy the export to the system clipboard
        #[arg(long)]
        clipboard: bool,
    },
    /// Append comments from a JSON collection
    Import { path: PathBuf },
    /// Save the default author name
    Author { name: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct QueryArgs {
    #[arg(long, short)]
    pub search: Option<String>,
    /// all, public or internal
    #[arg(long)]
    pub filter: Option<String>,
    /// timecode, oldest, newest or commenter
    #[arg(long)]
    pub sort: Option<String>,
    /// Advanced filter toggle (attachments, annotations, completed, incomplete, unread, mentions)
    #[arg(long = "with")]
    pub with: Vec<String>,
}

impl QueryArgs {
    pub fn to_query(&self, defaults: &ViewConfig) -> Query {
        let sort = match self.sort.as_deref() {
            Some(key) => SortOption::from_key(key),
            None => defaults.sort_option(),
        };
        let type_filter = match self.filter.as_deref() {
            Some(key) => TypeFilter::from_key(key),
            None => defaults.type_filter(),
        };
        Query::default()
            .with_search(self.search.clone().unwrap_or_default())
            .with_type_filter(type_filter)
            .with_filters(AdvancedFilters::from_keys(&self.with))
            .with_sort(sort)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: cli.config.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let store = open_store(&cli, &cfg)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &cfg, cli.config.as_deref(), &store, &mut out)
}

fn open_store(cli: &Cli, cfg: &Config) -> Result<storage::Store> {
    let path = cli.db.clone().or_else(|| cfg.storage.path.clone());
    debug!("opening comment store at {:?}", path);
    storage::Store::open(storage::Options { path }).context("open storage")
}

pub fn execute<W: Write>(
    command: Command,
    cfg: &Config,
    config_path: Option<&Path>,
    store: &dyn CommentStore,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::List(args) => {
            let comments = store.comments()?;
            let view = view::derive_view(&comments, &args.to_query(&cfg.view));
            write!(out, "{}", render_listing(&view, LIST_WIDTH))?;
        }
        Command::Add {
            timecode: at,
            text,
            author,
            attachments,
            sketch,
        } => {
            let seconds = timecode::parse(&at)?;
            let playhead = ManualPlayhead::at(seconds);
            let mut draft = if seconds < 0.0 {
                Draft::general()
            } else {
                Draft::at_playhead(&playhead)
            };
            draft.text = text;
            for path in &attachments {
                draft.attach(media::attachment_from_path(path)?);
            }
            if let Some(path) = sketch {
                let surface = Arc::new(Sketch::new());
                draft.observe(surface.clone());
                for stroke in read_strokes(&path)? {
                    surface.add_stroke(stroke);
                }
            }

            let author = author.unwrap_or_else(|| cfg.review.author.clone());
            let comment = store.add(draft.into_new_comment(author))?;
            let comments = store.comments()?;
            let number = view::comment_numbers(&comments).get(&comment.id).copied();
            writeln!(
                out,
                "Added {} at {} ({})",
                view::number_label(number),
                timecode::format(comment.timestamp),
                comment.id
            )?;
        }
        Command::Reply {
            parent,
            text,
            author,
        } => {
            let author = author.unwrap_or_else(|| cfg.review.author.clone());
            let reply = store.reply(
                &CommentId::from(parent.as_str()),
                NewComment::general(text, author),
            )?;
            writeln!(out, "Replied to {parent} ({})", reply.id)?;
        }
        Command::Delete { id } => {
            let removed = store.delete(&CommentId::from(id.as_str()))?;
            let suffix = if removed == 1 { "comment" } else { "comments" };
            writeln!(out, "Deleted {removed} {suffix}.")?;
        }
        Command::Seek { id } => {
            let id = CommentId::from(id.as_str());
            let comment = store
                .get(&id)?
                .ok_or(crate::data::StoreError::NotFound(id))?;
            let playhead = ManualPlayhead::default();
            match player::seek_to_comment(&playhead, &comment) {
                Some(at) => writeln!(out, "Seek to {} ({at:.3}s)", timecode::format(at))?,
                None => writeln!(out, "General comment; playhead unchanged.")?,
            }
        }
        Command::Counts => {
            let comments = store.comments()?;
            writeln!(out, "{}", counts_line(&view::counts_by_type(&comments)))?;
        }
        Command::Export {
            query,
            format,
            output,
            clipboard,
        } => {
            let comments = store.comments()?;
            let view = view::derive_view(&comments, &query.to_query(&cfg.view));
            let rendered = export::render(
                &view,
                Format::from_key(&format),
                cfg.export.include_replies,
            )?;
            if clipboard {
                export::copy_to_clipboard(&rendered)?;
            }
            match output {
                Some(path) => {
                    fs::write(&path, &rendered)
                        .with_context(|| format!("write export to {}", path.display()))?;
                    writeln!(
                        out,
                        "Exported {} comments to {}",
                        view.threads.len(),
                        path.display()
                    )?;
                }
                None if clipboard => {
                    writeln!(out, "Copied {} comments to the clipboard.", view.threads.len())?;
                }
                None => write!(out, "{rendered}")?,
            }
        }
        Command::Import { path } => {
            let (imported, skipped) = import_file(store, &path)?;
            writeln!(out, "Imported {imported} comments, skipped {skipped}.")?;
        }
        Command::Author { name } => {
            let path = config::save_author(config_path.map(Path::to_path_buf), &name)?;
            writeln!(out, "Default author saved to {}", friendly_path(Some(&path)))?;
        }
    }
    Ok(())
}

fn read_strokes(path: &Path) -> Result<Vec<Stroke>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read sketch file {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parse sketch file {}", path.display()))
}

fn import_file(store: &dyn CommentStore, path: &Path) -> Result<(usize, usize)> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read import file {}", path.display()))?;
    let comments: Vec<Comment> = serde_json::from_str(&data)
        .with_context(|| format!("parse import file {}", path.display()))?;
    let (top_level, replies): (Vec<_>, Vec<_>) =
        comments.into_iter().partition(Comment::is_top_level);

    let mut imported = 0;
    let mut skipped = 0;
    for comment in top_level.into_iter().chain(replies) {
        let id = comment.id.clone();
        match store.import(comment) {
            Ok(()) => imported += 1,
            Err(err) => {
                warn!("skipping comment {id}: {err:#}");
                skipped += 1;
            }
        }
    }
    Ok((imported, skipped))
}

pub fn counts_line(counts: &TypeCounts) -> String {
    format!(
        "{} {} · {} {} · {} {}",
        TypeFilter::All.label(),
        counts.all,
        TypeFilter::Public.label(),
        counts.public,
        TypeFilter::Internal.label(),
        counts.internal
    )
}

pub fn render_listing(view: &CommentView<'_>, width: usize) -> String {
    let mut out = String::new();
    out.push_str(&counts_line(&view.counts));
    out.push('\n');

    if view.is_empty() {
        out.push_str("No comments match.\n");
        return out;
    }

    let author_width = view
        .threads
        .iter()
        .map(|thread| UnicodeWidthStr::width(thread.comment.comment.author.as_str()))
        .max()
        .unwrap_or(0);
    let body = WrapOptions::new(width.max(BODY_INDENT.len() + 10))
        .initial_indent(BODY_INDENT)
        .subsequent_indent(BODY_INDENT);

    for thread in &view.threads {
        let comment = thread.comment.comment;
        let author = comment.author.as_str();
        let pad = author_width.saturating_sub(UnicodeWidthStr::width(author));
        out.push_str(&format!(
            "\n{:<5} {:>8}  {}{}  {}  ({})\n",
            thread.comment.label(),
            timecode::format(comment.timestamp),
            author,
            " ".repeat(pad),
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.id
        ));
        for line in wrap(&comment.text, &body) {
            out.push_str(&line);
            out.push('\n');
        }
        for attachment in &comment.attachments {
            out.push_str(&format!("{BODY_INDENT}{}\n", attachment.preview_label()));
        }
        if comment.has_drawing {
            out.push_str(&format!("{BODY_INDENT}[drawing]\n"));
        }
        for reply in &thread.replies {
            let prefix = format!("{BODY_INDENT}  ↳ {}: ", reply.author);
            let reply_indent = " ".repeat(BODY_INDENT.len() + 4);
            let opts = WrapOptions::new(width.max(prefix.len() + 10))
                .initial_indent(&prefix)
                .subsequent_indent(&reply_indent);
            for line in wrap(&reply.text, &opts) {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out
}

pub fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/review-notes/config.yaml".to_string()
    }
}
