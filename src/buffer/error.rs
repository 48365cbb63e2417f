use std::io;

use crate::{
    buffer::frame::FrameId,
    storage::{disk::FileId, page::page::PageId},
};

/// Errors surfaced by the buffer pool.
///
/// I/O failures from a [`PageFile`](crate::storage::disk::PageFile) pass
/// through unchanged; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Every frame is pinned, so no page can be brought in.
    #[error("buffer pool exhausted: every frame is pinned")]
    BufferPoolExhausted,

    #[error("page {page_no} of {file} is not pinned (frame {frame_id})")]
    PageNotPinned {
        file: String,
        page_no: PageId,
        frame_id: FrameId,
    },

    #[error("page {page_no} of {file} is still pinned (frame {frame_id})")]
    PagePinned {
        file: String,
        page_no: PageId,
        frame_id: FrameId,
    },

    /// The frame table and the page index disagree.
    #[error("frame {frame_id} is inconsistent: valid={valid} dirty={dirty} ref_bit={ref_bit}")]
    InconsistentFrame {
        frame_id: FrameId,
        dirty: bool,
        valid: bool,
        ref_bit: bool,
    },

    #[error("page {page_no} of file {file_id} is already mapped to frame {frame_id}")]
    AlreadyMapped {
        file_id: FileId,
        page_no: PageId,
        frame_id: FrameId,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BufferError>;
