//! Configuration parsing for spacesync
//!
//! This crate handles parsing the KDL configuration file and generating
//! the yabai signal script that feeds the daemon's event socket.

mod error;
mod generator;
mod model;
mod parser;

pub use error::ConfigError;
pub use generator::{generate_yabai_signals, write_yabai_signals, SIGNAL_LABEL_PREFIX};
pub use model::*;
pub use parser::{load_config, parse_config, parse_config_str};
