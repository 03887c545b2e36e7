pub mod cache;
pub mod compat;
pub mod config;
pub mod error;
pub mod geocode;
pub mod sheets;

pub use error::{AppError, Result};
