//! Core domain + application logic for the pivot points trading bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind
//! [`messaging::port::MessagingPort`], implemented in the adapter crate.

pub mod access;
pub mod actions;
pub mod bot;
pub mod broadcast;
pub mod channel;
pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod pivot;
pub mod settings;
pub mod utils;

pub use errors::{Error, Result};
