pub mod assets;
pub mod config;
pub mod error;
pub mod models;

pub use assets::{load_assets, save_assets};
pub use config::Config;
pub use error::{ConfigError, ExchangeError};
pub use models::*;
