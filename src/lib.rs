//! Multichat is a full-screen terminal chat client that asks several models
//! for a reply at once and lets the user keep the one they like.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the turn state machine, the conversation log, candidate
//!   accumulation and the background streaming session.
//! - [`provider`] implements the model backend over OpenAI-compatible
//!   streaming endpoints, one candidate per provider.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that feeds keys and ticks into the controller.
//! - [`api`] defines the chat payloads sent to and received from providers.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`], which loads
//! keys and configuration and hands a backend to [`ui::chat_loop::run_chat`].

pub mod api;
pub mod cli;
pub mod core;
pub mod provider;
pub mod ui;
pub mod utils;
