pub mod collection;
pub mod cursor;
mod errors;
pub mod fs;
mod locks;
pub mod partition;
pub mod partitioned;

pub use collection::{Collection, ListPage};
pub use cursor::PageToken;
pub use errors::{Result, StoreError};
pub use locks::PathLocks;
pub use partition::Partition;
pub use partitioned::{EntryPage, PartitionedCollection, PartitionedEntry, PAGE_SIZE};
