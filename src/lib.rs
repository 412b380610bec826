//! Regis - local backend for Regis AI Studio
//!
//! Proxies chat turns to hosted model providers (Anthropic Claude, Google
//! Gemini, xAI Grok) with request validation, retry with exponential
//! backoff for buffered calls, and SSE streaming. Also runs shell commands
//! and lists directories on behalf of the desktop frontend.

pub mod agent;
pub mod api;
pub mod cli;
pub mod config;
pub mod logging;
pub mod relay;
pub mod retry;
pub mod sidecar;
