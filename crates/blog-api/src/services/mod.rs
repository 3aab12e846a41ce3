//! Content services built on the core repositories

pub mod article;
pub mod category;

pub use article::{ArticleService, ArticleUpdate};
pub use category::CategoryService;

use blog_core::{BlogError, ErrorKind};
use std::error::Error as StdError;

fn internal(op: &'static str, err: impl Into<Box<dyn StdError + Send + Sync>>) -> BlogError {
    let err = err.into();
    tracing::error!(op, error = %err, "internal failure");
    BlogError::with_source(op, ErrorKind::Internal, err)
}
