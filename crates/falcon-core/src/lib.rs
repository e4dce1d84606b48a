pub mod activity;
pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod file;
pub mod filters;
pub mod io;
pub mod load;
pub mod notify;
pub mod order;
pub mod settings;
pub mod types;
pub mod views;

pub use error::{FalconError, Result};
