#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod data;
pub mod debug;
pub mod feed;
pub mod playback;
pub mod reel;
pub mod remote;
pub mod ui;
pub mod viewport;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
