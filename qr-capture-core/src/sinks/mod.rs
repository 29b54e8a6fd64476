pub mod journaling;
pub mod line_sink;
pub mod memory;
