pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod parsers;
pub mod response;
pub mod retry;
pub mod server;
pub mod service;
pub mod strategies;
pub mod tools;
