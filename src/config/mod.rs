pub mod schema;

pub use schema::{config_json_schema, default_config_path, AuthConfig, Config, SweepConfig};
