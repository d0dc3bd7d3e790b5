//! Provider plumbing for the two external services the pipeline consumes:
//! embeddings and chat-completion inference. Both speak either the Ollama
//! or an OpenAI-compatible API.

pub mod embeddings;
pub mod infer;
