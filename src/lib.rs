pub use eisen_cli::cli;
pub use eisen_cli::commands;
pub use eisen_cli::config;
pub use eisen_cli::init_tracing;
pub use eisen_cli::AppConfig;

pub use eisen_core as core;
pub use eisen_core::capture;
pub use eisen_core::database as db;
pub use eisen_core::model;
pub use eisen_core::parser;
