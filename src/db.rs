pub mod store;
pub use store::{FollowUpRepair, RecordStore};
pub mod collection_repo;
pub use collection_repo::PgCollectionRepository;
pub mod memory_repo;
pub use memory_repo::MemoryCollectionRepository;
