//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the main interaction loop that routes keys and ticks into
//!   [`crate::core::app::App`].
//! - [`renderer`] and [`wrap`]: frame composition and width-aware wrapping.
//! - [`view`]: input box and scroll position.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns the conversation and the turn logic.

pub mod chat_loop;
pub mod renderer;
pub mod view;
pub mod wrap;
