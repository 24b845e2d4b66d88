#![allow(clippy::uninlined_format_args)]

pub mod annotation;
pub mod app;
pub mod comment;
pub mod config;
pub mod data;
pub mod draft;
pub mod export;
pub mod media;
pub mod player;
pub mod query;
pub mod storage;
pub mod timecode;
pub mod view;

pub use app::run;
pub use comment::{Attachment, Comment, CommentId, NewComment};
pub use query::{AdvancedFilters, Query, SortOption, TypeFilter};
pub use view::{counts_by_type, derive_top_level_view, derive_view, replies_of};
