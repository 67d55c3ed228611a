// Repositories module - data access layer

pub mod cart_repository;
pub mod memory_repository;
pub mod table_manager;


pub use cart_repository::{CartRepository, DynamoDbCartRepository, FLOOR_QUANTITY};
pub use memory_repository::InMemoryCartRepository;
pub use table_manager::TableManager;
