use std::collections::HashMap;

use log::debug;

use crate::comment::{Comment, CommentId, CommentKind};
use crate::query::Query;

pub const UNNUMBERED_MARKER: &str = "•";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberedComment<'a> {
    pub comment: &'a Comment,
    pub number: Option<usize>,
}

impl NumberedComment<'_> {
    pub fn label(&self) -> String {
        number_label(self.number)
    }
}

pub fn number_label(number: Option<usize>) -> String {
    match number {
        Some(number) => format!("#{number}"),
        None => UNNUMBERED_MARKER.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeCounts {
    pub all: usize,
    pub public: usize,
    pub internal: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thread<'a> {
    pub comment: NumberedComment<'a>,
    pub replies: Vec<&'a Comment>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentView<'a> {
    pub threads: Vec<Thread<'a>>,
    pub counts: TypeCounts,
}

impl CommentView<'_> {
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn reply_count(&self) -> usize {
        self.threads.iter().map(|thread| thread.replies.len()).sum()
    }
}

// Stable numbers for time-anchored top-level comments, by ascending timestamp.
pub fn comment_numbers(all: &[Comment]) -> HashMap<&CommentId, usize> {
    let mut anchored: Vec<&Comment> = all
        .iter()
        .filter(|c| c.is_top_level() && c.is_time_anchored())
        .collect();
    anchored.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    anchored
        .into_iter()
        .enumerate()
        .map(|(idx, c)| (&c.id, idx + 1))
        .collect()
}

pub fn derive_top_level_view<'a>(all: &'a [Comment], query: &Query) -> Vec<NumberedComment<'a>> {
    let mut visible: Vec<&Comment> = all
        .iter()
        .filter(|c| c.is_top_level())
        .filter(|c| query.matches(c))
        .collect();
    visible.sort_by(|a, b| query.sort.compare(a, b));

    let numbers = comment_numbers(all);
    debug!(
        "derived {} of {} comments (sort={}, filter={})",
        visible.len(),
        all.len(),
        query.sort.as_str(),
        query.type_filter.as_str()
    );
    visible
        .into_iter()
        .map(|comment| NumberedComment {
            comment,
            number: numbers.get(&comment.id).copied(),
        })
        .collect()
}

pub fn replies_of<'a>(all: &'a [Comment], parent: &CommentId) -> Vec<&'a Comment> {
    all.iter()
        .filter(|c| c.parent_id.as_ref() == Some(parent))
        .collect()
}

pub fn replies_by_parent(all: &[Comment]) -> HashMap<&CommentId, Vec<&Comment>> {
    let mut grouped: HashMap<&CommentId, Vec<&Comment>> = HashMap::new();
    for comment in all {
        if let Some(parent) = comment.parent_id.as_ref() {
            grouped.entry(parent).or_default().push(comment);
        }
    }
    grouped
}

pub fn counts_by_type(all: &[Comment]) -> TypeCounts {
    all.iter()
        .filter(|c| c.is_top_level())
        .fold(TypeCounts::default(), |mut counts, c| {
            counts.all += 1;
            match c.kind() {
                CommentKind::Public => counts.public += 1,
                CommentKind::Internal => counts.internal += 1,
            }
            counts
        })
}

pub fn derive_view<'a>(all: &'a [Comment], query: &Query) -> CommentView<'a> {
    let mut replies = replies_by_parent(all);
    let threads = derive_top_level_view(all, query)
        .into_iter()
        .map(|numbered| Thread {
            replies: replies.remove(&numbered.comment.id).unwrap_or_default(),
            comment: numbered,
        })
        .collect();
    CommentView {
        threads,
        counts: counts_by_type(all),
    }
}
