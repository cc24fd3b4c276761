//! Asynchronous orchestration core of the chat client.
//!
//! Everything here is platform-free: network and timers are reached only
//! through the traits in [`ports`].

pub mod ports;
pub mod conversation;
pub mod session;
pub mod run;
pub mod chat;

#[cfg(test)]
mod tests;
