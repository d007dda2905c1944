pub mod conversation;
pub mod embedding_service;
pub mod knowledge_index;
pub mod llm_service;
pub mod memory;
pub mod providers;

pub use embedding_service::EmbeddingService;
pub use llm_service::LlmService;
