pub mod code;
pub mod config;
pub mod error;
pub mod frame;
pub mod input;
pub mod scan_result;
pub mod state;
