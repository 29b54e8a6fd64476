pub mod decode_engine;
pub mod event_source;
pub mod frame_source;
pub mod result_sink;
pub mod session_delegate;
