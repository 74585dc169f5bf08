pub mod chat_stream;
pub mod config;
pub mod controller;
pub mod directive;
pub mod error;
pub mod memory;
pub mod message;
pub mod persona;
pub mod session;
pub mod speech;
pub mod storage;
pub mod stream;
#[cfg(test)]
pub mod testing;
