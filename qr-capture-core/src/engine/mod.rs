pub mod rqrr_engine;
