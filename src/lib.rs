//! Page cache for a disk-oriented storage engine.
//!
//! A [`BufferPoolManager`] keeps a fixed number of pages resident, maps
//! `(file, page number)` to frames through a [`PageIndex`], and picks eviction
//! victims with a clock (second-chance) sweep. Files are anything implementing
//! [`PageFile`]; [`DbFile`] and [`MemFile`] are provided.

pub mod buffer;
pub mod config;
pub mod storage;
pub mod utils;


pub use buffer::{
    buffer_pool_manager::{BufferPoolManager, BufferStats, PoolSnapshot, SharedBufferPool},
    error::{BufferError, Result},
    frame::{FrameId, FrameSnapshot},
    page_index::PageIndex,
};
pub use config::BufferConfig;
pub use storage::{
    disk::{DbFile, FileId, FileRef, MemFile, PageFile},
    page::page::{Page, PageId},
};
