//! # imdb-pipeline core
//!
//! Pure logic for the IMDb pipeline: record types, field normalization,
//! batch cleaning, and the aggregate view model rendered by the dashboard.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Everything here is
//! deterministic and can be tested without a database.

pub mod clean;
pub mod error;
pub mod genres;
pub mod models;
pub mod normalize;
pub mod scatter;
pub mod view;
