#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod filtered_stream;
pub mod lookup;
pub mod request;
pub mod retry;
pub mod stream;
pub mod types;

mod decode;
mod reader;

pub use client::Client;
pub use config::Config;
pub use error::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
