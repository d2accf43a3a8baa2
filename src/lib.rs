pub mod application;
pub mod config;
pub mod error;
pub mod http;
pub mod install;
pub mod llm;
pub mod loader;
pub mod pack;
pub mod package;
pub mod registry;
pub mod runtime;
pub mod selection;

pub use application::Autopack;
pub use config::PackConfig;
pub use error::{InvokeError, PackError};
