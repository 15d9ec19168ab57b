pub mod asset;
pub mod config;
pub mod error;

pub use asset::*;
pub use config::{load_dotenv, Config};
pub use error::EngineError;
