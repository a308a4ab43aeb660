pub mod app;
pub mod chat_stream;
pub mod config;
pub mod customer;
pub mod gemini;
pub mod message;
pub mod pricing;
pub mod transcript;
