pub mod backend;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod server;
pub mod translation;

pub use error::{Error, Result};
