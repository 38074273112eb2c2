pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod history;
pub mod report;

pub use error::EngineError;
