//! Bounded list of failure comments.
//!
//! Once the list is full further failures still count toward the grade and
//! the summary, but their text is dropped. Fatal errors are the exception:
//! they take over the last slot.

use crate::core::utils::truncate_at_boundary;

pub const MAX_COMMENTS: usize = 20;
const MAX_TITLE_LEN: usize = 1024;
const MAX_BODY_LEN: usize = 100 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Shown in the failed-tests list
    pub title: String,
    /// Shown above the body, with the grade reduction
    pub title_with_reduction: String,
    pub body: String,
}

impl Comment {
    pub fn new(
        title: impl Into<String>,
        title_with_reduction: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let mut comment = Self {
            title: title.into(),
            title_with_reduction: title_with_reduction.into(),
            body: body.into(),
        };
        truncate_at_boundary(&mut comment.title, MAX_TITLE_LEN);
        truncate_at_boundary(&mut comment.title_with_reduction, MAX_TITLE_LEN);
        truncate_at_boundary(&mut comment.body, MAX_BODY_LEN);
        comment
    }
}

#[derive(Debug, Default)]
pub struct Comments {
    items: Vec<Comment>,
}

impl Comments {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_COMMENTS
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.items.iter()
    }

    /// Append unless full. Returns whether the comment was kept.
    pub fn push(&mut self, comment: Comment) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(comment);
        true
    }

    /// Append, overwriting the last comment when full.
    pub fn push_replacing_last(&mut self, comment: Comment) {
        if self.is_full() {
            self.items.truncate(MAX_COMMENTS - 1);
        }
        self.items.push(comment);
    }
}
