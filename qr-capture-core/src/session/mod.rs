pub mod stop;
pub mod trigger;
