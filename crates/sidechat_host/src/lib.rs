//! Sidechat host: runtimes wiring the pure context machines to real
//! transports, plus the terminal shell binary.

pub mod app;
pub mod bus;
pub mod chat_ui;
pub mod config;
pub mod host_runtime;
pub mod logging;
pub mod relay_runtime;
