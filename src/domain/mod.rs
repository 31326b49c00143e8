pub mod connection_state;
pub mod export;
pub mod live_collection;
pub mod models;
pub mod navigation;
pub mod notification;
pub mod pipeline;
pub mod sequence;
pub mod site_accounts;
pub mod validation;
pub mod views;
