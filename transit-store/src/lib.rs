pub mod app_config;
pub mod events;
pub mod memory;
pub mod redis_repo;

pub use events::BroadcastPush;
pub use memory::InMemoryStore;
pub use redis_repo::RedisStore;
