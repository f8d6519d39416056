pub mod auth;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod page;
pub mod queue;
pub mod scrape;
pub mod session;
pub mod store;

pub use trawl_common::model;
