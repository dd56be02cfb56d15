pub mod kv;
pub mod ledger;
pub mod memory;

pub use kv::{KvCollection, KvStore};
pub use ledger::LedgerStore;
pub use memory::MemoryCache;
