//! Reference provider adapters.

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai-compatible")]
pub mod openai_compatible;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiAdapter, GeminiConfig};
#[cfg(feature = "openai-compatible")]
pub use openai_compatible::{OpenAiCompatibleAdapter, OpenAiCompatibleConfig};
