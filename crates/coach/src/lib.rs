#![deny(unsafe_code)]

/// Fish Coach chat core.
///
/// The crate keeps the coach screen's conversation state, drives the single
/// outstanding assistant call, and decides when the message view follows new
/// replies. Presentation is left to the caller; a terminal front end lives in
/// [`app`].
pub mod app;
/// Session state machine, scroll policy, loading pulse and async driver.
pub mod chat;
/// Settings loading.
pub mod settings;
