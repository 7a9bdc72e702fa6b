#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod canonical;
pub mod config;
pub mod data;
pub mod hidden;
pub mod logging;
pub mod session;
pub mod storage;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
pub use canonical::canonicalize;
pub use hidden::{HiddenRegistry, Identified, ScopeKey};
