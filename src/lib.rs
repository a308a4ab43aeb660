//! StitchPerfect is a terminal concierge for a tailoring boutique.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the pricing guide and prompt, contact validation, the
//!   transcript, the streaming chat session and its Gemini backend, and the
//!   session controller that ties them together.
//! - [`ui`] renders the contact and chat screens and runs the interactive
//!   event loop.
//! - [`auth`] finds the Gemini API key in the environment or the system
//!   keyring.
//! - [`cli`] parses arguments and dispatches into the other layers.
//!
//! The binary (`src/main.rs`) only calls [`cli::main`].

pub mod auth;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
