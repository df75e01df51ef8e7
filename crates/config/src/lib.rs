// Configuration loading

pub mod settings;

pub use settings::{Settings, URL_ENV_VAR};
