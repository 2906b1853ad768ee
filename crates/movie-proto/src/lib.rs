pub mod config;
pub mod error;
pub mod platform;
pub mod protocol;
pub mod route;
pub mod store;
