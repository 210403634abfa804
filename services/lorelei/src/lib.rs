pub mod backup;
pub mod config;
pub mod gemini_adapter;
pub mod openai_adapter;
pub mod prompt_loader;
pub mod voice;
