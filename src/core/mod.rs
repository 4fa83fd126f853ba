pub mod app;
pub mod backend;
pub mod candidates;
pub mod config;
pub mod display;
pub mod message;
pub mod session;
pub mod turn;
