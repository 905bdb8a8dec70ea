pub mod camera;
pub mod client;
pub mod config;
pub mod display_settings;
pub mod error;
pub mod models;
pub mod poll;
pub mod qr;
pub mod session;
pub mod util;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{Error, Result};
