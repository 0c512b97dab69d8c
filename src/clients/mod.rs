pub mod flexible;
pub mod gemini;
pub mod mock;

pub use flexible::*;
pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::*;
