pub mod config;
pub mod dispatch;
pub mod logging;
pub mod monitor;
pub mod source;
pub mod store;
