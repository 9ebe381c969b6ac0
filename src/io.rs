pub mod config;

pub use config::{ModelConfig, build_from_config, load_config, parse_config, summarize_config};
