pub mod cpu_clock;
pub mod orchestrator;
pub mod staging;
