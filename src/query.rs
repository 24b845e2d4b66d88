use std::cmp::Ordering;

use crate::comment::{Comment, CommentKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Public,
    Internal,
}

impl TypeFilter {
    pub const ALL: [TypeFilter; 3] = [TypeFilter::All, TypeFilter::Public, TypeFilter::Internal];

    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "public" => TypeFilter::Public,
            "internal" => TypeFilter::Internal,
            _ => TypeFilter::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::All => "all",
            TypeFilter::Public => "public",
            TypeFilter::Internal => "internal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TypeFilter::All => "All comments",
            TypeFilter::Public => "Public",
            TypeFilter::Internal => "Internal",
        }
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Public => comment.kind() == CommentKind::Public,
            TypeFilter::Internal => comment.kind() == CommentKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOption {
    #[default]
    Timecode,
    Oldest,
    Newest,
    Commenter,
}

impl SortOption {
    pub const ALL: [SortOption; 4] = [
        SortOption::Timecode,
        SortOption::Oldest,
        SortOption::Newest,
        SortOption::Commenter,
    ];

    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "oldest" => SortOption::Oldest,
            "newest" => SortOption::Newest,
            "commenter" => SortOption::Commenter,
            _ => SortOption::Timecode,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Timecode => "timecode",
            SortOption::Oldest => "oldest",
            SortOption::Newest => "newest",
            SortOption::Commenter => "commenter",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOption::Timecode => "Timecode",
            SortOption::Oldest => "Oldest",
            SortOption::Newest => "Newest",
            SortOption::Commenter => "Commenter",
        }
    }

    pub fn compare(&self, a: &Comment, b: &Comment) -> Ordering {
        match self {
            SortOption::Timecode => a.timestamp.total_cmp(&b.timestamp),
            SortOption::Oldest => a.created_at.cmp(&b.created_at),
            SortOption::Newest => b.created_at.cmp(&a.created_at),
            SortOption::Commenter => a.author.cmp(&b.author),
        }
    }
}

// Only `attachments` narrows the view. The other toggles are carried along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AdvancedFilters {
    pub annotations: bool,
    pub attachments: bool,
    pub completed: bool,
    pub incomplete: bool,
    pub unread: bool,
    pub mentions_and_reactions: bool,
}

impl AdvancedFilters {
    pub const KEYS: [&'static str; 6] = [
        "annotations",
        "attachments",
        "completed",
        "incomplete",
        "unread",
        "mentions",
    ];

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filters = Self::default();
        for key in keys {
            filters.toggle(key.as_ref());
        }
        filters
    }

    pub fn toggle(&mut self, key: &str) {
        let slot = match key.trim().to_ascii_lowercase().as_str() {
            "annotations" => &mut self.annotations,
            "attachments" => &mut self.attachments,
            "completed" => &mut self.completed,
            "incomplete" => &mut self.incomplete,
            "unread" => &mut self.unread,
            "mentions" | "mentions_and_reactions" | "mentionsandreactions" => {
                &mut self.mentions_and_reactions
            }
            _ => return,
        };
        *slot = !*slot;
    }

    pub fn active_count(&self) -> usize {
        [
            self.annotations,
            self.attachments,
            self.completed,
            self.incomplete,
            self.unread,
            self.mentions_and_reactions,
        ]
        .iter()
        .filter(|on| **on)
        .count()
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        if self.attachments && !comment.has_attachments() {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub search: String,
    pub type_filter: TypeFilter,
    pub filters: AdvancedFilters,
    pub sort: SortOption,
}

impl Query {
    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_type_filter(mut self, type_filter: TypeFilter) -> Self {
        self.type_filter = type_filter;
        self
    }

    pub fn with_filters(mut self, filters: AdvancedFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sort(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches_search(&self, comment: &Comment) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        comment.text.to_lowercase().contains(&needle)
            || comment.author.to_lowercase().contains(&needle)
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        self.matches_search(comment)
            && self.type_filter.matches(comment)
            && self.filters.matches(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::{Attachment, NewComment};

    fn comment(text: &str, author: &str) -> Comment {
        NewComment::new(text, author, 1.0).into_comment("c".into(), None)
    }

    #[test]
    fn unknown_keys_fall_back_to_defaults() {
        assert_eq!(SortOption::from_key("bogus"), SortOption::Timecode);
        assert_eq!(SortOption::from_key(" Newest "), SortOption::Newest);
        assert_eq!(TypeFilter::from_key(""), TypeFilter::All);
        assert_eq!(TypeFilter::from_key("INTERNAL"), TypeFilter::Internal);
    }

    #[test]
    fn keys_round_trip() {
        for sort in SortOption::ALL {
            assert_eq!(SortOption::from_key(sort.as_str()), sort);
        }
        for filter in TypeFilter::ALL {
            assert_eq!(TypeFilter::from_key(filter.as_str()), filter);
        }
    }

    #[test]
    fn search_is_case_insensitive_over_text_and_author() {
        let c = comment("Fix the Color grade", "Bob");
        assert!(Query::default().with_search("color").matches(&c));
        assert!(Query::default().with_search("bOB").matches(&c));
        assert!(!Query::default().with_search("audio").matches(&c));
        assert!(Query::default().with_search("").matches(&c));
    }

    #[test]
    fn only_attachment_toggle_filters() {
        let plain = comment("hi", "amy");
        let mut with_file = comment("hi", "amy");
        with_file.attachments.push(Attachment {
            url: "file:///a.png".into(),
            mime: "image/png".into(),
            name: "a.png".into(),
        });

        let reserved = AdvancedFilters::from_keys([
            "annotations",
            "completed",
            "incomplete",
            "unread",
            "mentions",
        ]);
        assert_eq!(reserved.active_count(), 5);
        assert!(reserved.matches(&plain));

        let attachments = AdvancedFilters::from_keys(["attachments", "nonsense"]);
        assert_eq!(attachments.active_count(), 1);
        assert!(!attachments.matches(&plain));
        assert!(attachments.matches(&with_file));
    }

    #[test]
    fn toggle_twice_clears() {
        let filters = AdvancedFilters::from_keys(["attachments", "attachments"]);
        assert_eq!(filters, AdvancedFilters::default());
    }
}
