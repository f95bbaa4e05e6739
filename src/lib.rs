#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod content;
pub mod data;
pub mod dictionary;
pub mod error;
pub mod exercise;
pub mod feed;
pub mod like;
pub mod model;
pub mod moderation;
pub mod pager;
pub mod prefetch;
pub mod sequence;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod transcript;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
pub use error::{FeedError, FeedResult};
pub use feed::Feed;
