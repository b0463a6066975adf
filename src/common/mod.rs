//! Common utilities shared by the transport and the session

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, OpenStage, Result};
