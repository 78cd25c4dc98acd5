pub mod test_config;

pub use test_config::{build_app, create_test_config, image_request, read_json};
