pub mod app;
pub mod config;
pub mod pipeline;
pub mod remote;
pub mod shared;
