//! Runtime state: the Store and the instances it owns.

pub mod global;
pub mod instances;
pub mod link;
pub mod memory;
pub mod store;
pub mod table;

pub use global::GlobalInstance;
pub use instances::FuncInstance;
pub use link::{link, Linked};
pub use memory::{MemoryInstance, MAX_PAGES, PAGE_SIZE};
pub use store::Store;
pub use table::TableInstance;
