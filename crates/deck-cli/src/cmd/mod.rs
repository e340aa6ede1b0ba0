pub mod cache;
pub mod collection;
pub mod config;
pub mod session;
pub mod setup;
