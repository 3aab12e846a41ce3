//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod articles;
pub mod auth;
pub mod categories;
pub mod health;
pub mod users;
