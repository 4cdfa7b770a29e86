//! Client for Google's Generative Language (Gemini) REST API.
//!
//! Callers depend on the [`TextGenerator`] trait so the HTTP client can be
//! swapped for a stub in tests.

pub mod client;
pub mod error;
pub mod generator;
pub mod types;

pub use client::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::LlmError;
pub use generator::TextGenerator;
pub use types::{GenerationOptions, HarmBlockThreshold, HarmCategory, SafetySetting};
