// HTTP server modules
pub mod handlers;
pub mod models;
pub mod routes;
pub mod sse;
pub mod state;

// Configuration
pub mod config;

// Storage, accounts and the chat domain
pub mod auth;
pub mod chat;
pub mod db;

// LLM abstraction layer
pub mod llm;
