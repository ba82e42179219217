//! Repository layer for data access

pub mod blacklist;
pub mod skip_list;

// Re-export concrete repository implementations
pub use blacklist::{DbBlacklistRepository, MemoryBlacklistRepository};
pub use skip_list::{DbSkipListRepository, MemorySkipListRepository};

// Re-export repository traits
pub use blacklist::BlacklistRepository;
pub use skip_list::SkipListRepository;
