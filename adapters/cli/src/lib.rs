#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Gridmerge session in the terminal.

pub mod config;
pub mod input;
pub mod session;
pub mod terminal;
pub mod transfer;

pub use config::{ConfigError, GameConfig};
pub use session::{GameSession, SessionSettings, SessionStatus};
