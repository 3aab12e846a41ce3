//! Articles

use crate::category::CategoryId;
use crate::error::ErrorKind;
use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ArticleId = i64;

pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 100;
pub const CONTENT_MIN_LEN: usize = 10;
pub const CONTENT_MAX_LEN: usize = 16_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub category_id: CategoryId,
}

/// Requested article changes; `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.category_id.is_none()
    }
}

impl NewArticle {
    pub fn new(
        title: &str,
        content: &str,
        author_id: UserId,
        category_id: CategoryId,
    ) -> Result<Self, ErrorKind> {
        let title = title.trim().to_string();
        validate_title(&title)?;
        validate_content(content)?;
        Ok(Self {
            title,
            content: content.to_string(),
            author_id,
            category_id,
        })
    }
}

impl Article {
    pub fn can_be_modified_by(&self, user_id: UserId, is_admin: bool) -> bool {
        is_admin || self.author_id == user_id
    }

    /// Apply changes, failing if nothing would actually change.
    pub fn apply(&mut self, changes: ArticleChanges) -> Result<(), ErrorKind> {
        if changes.is_empty() {
            return Err(ErrorKind::NoDataToUpdate);
        }

        let mut changed = false;
        if let Some(title) = changes.title {
            let title = title.trim();
            validate_title(title)?;
            if title != self.title {
                self.title = title.to_string();
                changed = true;
            }
        }
        if let Some(content) = changes.content {
            validate_content(&content)?;
            if content != self.content {
                self.content = content;
                changed = true;
            }
        }
        if let Some(category_id) = changes.category_id {
            if category_id != self.category_id {
                self.category_id = category_id;
                changed = true;
            }
        }

        if !changed {
            return Err(ErrorKind::ArticleUnchanged);
        }
        Ok(())
    }
}

pub fn validate_title(title: &str) -> Result<(), ErrorKind> {
    let len = title.chars().count();
    if len < TITLE_MIN_LEN {
        return Err(ErrorKind::TitleTooShort);
    }
    if len > TITLE_MAX_LEN {
        return Err(ErrorKind::TitleTooLong);
    }
    if title.contains(['<', '>']) {
        return Err(ErrorKind::TitleHasHtml);
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<(), ErrorKind> {
    let len = content.trim().chars().count();
    if len < CONTENT_MIN_LEN {
        return Err(ErrorKind::ContentTooShort);
    }
    if len > CONTENT_MAX_LEN {
        return Err(ErrorKind::ContentTooLong);
    }
    if content.to_ascii_lowercase().contains("<script") {
        return Err(ErrorKind::ContentHasScript);
    }
    Ok(())
}
