mod parser;
mod types;

pub use parser::{load_config, parse_config, parse_config_str};
pub use types::{FolioConfig, CONFIG_FILE, DEFAULT_SENTINEL};
