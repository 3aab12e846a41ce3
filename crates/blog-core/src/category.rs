//! Article categories

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CategoryId = i64;

pub const CATEGORY_NAME_MIN_LEN: usize = 2;
pub const CATEGORY_NAME_MAX_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

impl NewCategory {
    /// Validate the name and derive the slug.
    pub fn from_name(name: &str) -> Result<Self, ErrorKind> {
        let name = name.trim().to_string();
        validate_category_name(&name)?;
        let slug = slugify(&name);
        Ok(Self { name, slug })
    }
}

impl Category {
    pub fn rename(&mut self, name: &str) -> Result<(), ErrorKind> {
        let name = name.trim();
        if name == self.name {
            return Err(ErrorKind::CategoryUnchanged);
        }
        validate_category_name(name)?;
        self.name = name.to_string();
        self.slug = slugify(name);
        Ok(())
    }
}

pub fn validate_category_name(name: &str) -> Result<(), ErrorKind> {
    let len = name.chars().count();
    if len < CATEGORY_NAME_MIN_LEN {
        return Err(ErrorKind::CategoryNameTooShort);
    }
    if len > CATEGORY_NAME_MAX_LEN {
        return Err(ErrorKind::CategoryNameTooLong);
    }
    Ok(())
}

/// Lowercase ASCII alphanumerics; every other run of characters becomes a
/// single `-`. Names without any ASCII alphanumerics fall back to a hex
/// encoding of their bytes so the slug is never empty.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        return name.bytes().map(|b| format!("{b:02x}")).collect();
    }
    slug
}
