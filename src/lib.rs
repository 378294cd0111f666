pub mod api;
pub mod balance;     // Client side of the token balance document
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod ipfs;
pub mod listings;    // Marketplace fetch and normalization
pub mod metrics;
pub mod purchase;
pub mod reward;      // Ad-watch timer and dashboard
pub mod session;
pub mod store;
pub mod utils;
