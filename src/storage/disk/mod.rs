use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::storage::page::page::{Page, PageId};

pub mod db_file;
pub mod memory;

pub use db_file::DbFile;
pub use memory::MemFile;

pub type FileId = u64;

pub type FileRef = Arc<dyn PageFile>;

// Process wide monotonically increasing file identifier
static MONO_ID: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_file_id() -> FileId {
    MONO_ID.fetch_add(1, Ordering::SeqCst)
}

/// Page-granular storage the buffer pool reads from and writes back to.
///
/// Implementations own their on-disk layout and durability. Every method takes
/// `&self` because a file is shared between the pool's frames and its callers;
/// implementations synchronise internally.
pub trait PageFile: Send + Sync {
    /// Identity of this file for the lifetime of the process.
    fn file_id(&self) -> FileId;

    fn filename(&self) -> String;

    fn read_page(&self, page_no: PageId) -> io::Result<Page>;

    /// Writes `page` to the slot named by its own page number.
    fn write_page(&self, page: &Page) -> io::Result<()>;

    /// Allocates a zeroed page and returns it with its assigned number.
    fn allocate_page(&self) -> io::Result<Page>;

    fn delete_page(&self, page_no: PageId) -> io::Result<()>;
}
