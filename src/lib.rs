pub mod audio_capture;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod indicator;
pub mod mock_server;
pub mod panel;
pub mod response;
pub mod schedule;
pub mod upload;
pub mod wav;

pub use error::{EdgeError, Result};
