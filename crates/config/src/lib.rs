pub mod config;
pub mod default;
pub mod loader;
pub mod validator;
