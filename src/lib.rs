pub mod cli;
pub mod codec;
pub mod config;
pub mod distance;
pub mod dnn;
pub mod engine;
pub mod error;
pub mod features;
pub mod image;
pub mod indexer;
pub mod matcher;
pub mod strategy;
pub mod utils;

pub use config::Opts;
pub use engine::{Engine, GenerateRequest, IdentifyRequest};
pub use error::{CbirError, Result};
pub use strategy::Strategy;
