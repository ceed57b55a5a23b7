pub mod models;
pub mod normalize;
pub mod parser;

pub use models::{
    LocationConfig, RawDirectives, ServerConfig, DEFAULT_HOST, DEFAULT_INDEX,
    DEFAULT_MAX_BODY_SIZE, DEFAULT_PORT, DEFAULT_ROOT,
};
pub use normalize::normalize;
pub use parser::{apply_defaults, apply_inheritance, parse_config, parse_config_str};
