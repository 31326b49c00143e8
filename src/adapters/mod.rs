pub mod engine_io;
pub mod excel;
pub mod gateway;
pub mod pdf;
pub mod push_channel;
pub mod state_store;
pub mod status_api;
pub mod wire;
