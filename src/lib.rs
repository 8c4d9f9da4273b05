mod api;
pub mod args;
pub mod commands;
mod config;
mod credentials;
mod error;
mod model;
mod utils;

pub use api::Mode;
pub use config::Config;
pub use error::Error;
pub use error::Result;
