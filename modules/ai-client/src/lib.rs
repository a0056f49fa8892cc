pub mod error;
pub mod openai;
pub mod util;

pub use error::{AiError, Result};
pub use openai::{OpenAi, StructuredOutput, GEMINI_OPENAI_URL, OPENAI_API_URL};
pub use util::strip_code_blocks;
