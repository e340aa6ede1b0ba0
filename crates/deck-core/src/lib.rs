pub mod cache;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod detect;
pub mod error;
pub mod fetch;
pub mod installer;
pub mod io;
pub mod lock;
pub mod mux;
pub mod orchestrator;
pub mod paths;
pub mod session;
pub mod tasks;
pub mod types;

pub use error::{DeckError, Result};
