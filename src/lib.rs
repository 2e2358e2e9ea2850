pub mod board;
pub mod cache;
pub mod config;
pub mod error;
pub mod layouts;
pub mod loader;
pub mod math;
pub mod pass;
pub mod rand;
pub mod render;
pub mod store;
pub mod zones;
