pub mod images_mock;

pub use images_mock::{
    create_images_response, setup_azure_images_mock, setup_failing_images_mock,
    setup_openai_images_mock,
};
