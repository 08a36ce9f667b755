pub mod auction;
pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod identity;
pub mod imagegen;
pub mod message_broker;
pub mod scheduler;
pub mod state;
pub mod store;
