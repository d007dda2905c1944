pub mod memory_store;
pub mod models;
pub mod pool;
pub mod repository;
pub mod store;

pub use memory_store::InMemoryMessageStore;
pub use models::*;
pub use pool::DbPool;
pub use repository::PgMessageStore;
pub use store::MessageStore;

#[cfg(test)]
pub use store::MockMessageStore;
