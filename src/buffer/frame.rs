use std::fmt;

use crate::storage::{
    disk::{FileId, FileRef, PageFile},
    page::page::{PageId, INVALID_PAGE_ID},
};

pub type FrameId = u32;

/// Book-keeping for one slot of the buffer pool.
///
/// `frame_id` equals the slot's position and never changes. The owning file
/// and page number only mean something while `valid` is set; an invalid frame
/// is never pinned or dirty.
pub struct FrameHeader {
    pub(crate) frame_id: FrameId,
    pub(crate) file: Option<FileRef>,
    pub(crate) page_id: PageId,
    pub(crate) pin_count: u32,
    pub(crate) is_dirty: bool,
    pub(crate) valid: bool,
    pub(crate) ref_bit: bool,
}

impl FrameHeader {
    pub fn new(frame_id: FrameId) -> Self {
        FrameHeader {
            frame_id,
            file: None,
            page_id: INVALID_PAGE_ID,
            pin_count: 0,
            is_dirty: false,
            valid: false,
            ref_bit: false,
        }
    }

    /// Marks the frame as holding `page_id` of `file`, pinned once and
    /// freshly referenced.
    pub fn set(&mut self, file: FileRef, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.pin_count = 1;
        self.is_dirty = false;
        self.valid = true;
        self.ref_bit = true;
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.page_id = INVALID_PAGE_ID;
        self.pin_count = 0;
        self.is_dirty = false;
        self.valid = false;
        self.ref_bit = false;
    }

    pub fn pin(&mut self) -> u32 {
        self.pin_count += 1;
        self.pin_count
    }

    /// Returns the remaining pin count, or `None` if the frame was not pinned.
    pub fn unpin(&mut self) -> Option<u32> {
        self.pin_count = self.pin_count.checked_sub(1)?;
        Some(self.pin_count)
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn file_id(&self) -> Option<FileId> {
        self.file.as_ref().map(|file| file.file_id())
    }

    pub fn owned_by(&self, file_id: FileId) -> bool {
        self.file_id() == Some(file_id)
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn ref_bit(&self) -> bool {
        self.ref_bit
    }

    pub fn is_evictable(&self) -> bool {
        self.pin_count == 0
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            frame_id: self.frame_id,
            file: self.file.as_ref().map(|file| file.filename()),
            page_id: self.valid.then_some(self.page_id),
            pin_count: self.pin_count,
            is_dirty: self.is_dirty,
            valid: self.valid,
            ref_bit: self.ref_bit,
        }
    }
}

/// Point-in-time copy of a frame header, detached from the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub frame_id: FrameId,
    pub file: Option<String>,
    pub page_id: Option<PageId>,
    pub pin_count: u32,
    pub is_dirty: bool,
    pub valid: bool,
    pub ref_bit: bool,
}

impl fmt::Display for FrameSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameNo:{} ", self.frame_id)?;

        match (&self.file, self.page_id) {
            (Some(file), Some(page_id)) => write!(f, "file:{} pageNo:{} ", file, page_id)?,
            _ => write!(f, "file:NULL pageNo:- ")?,
        }

        write!(
            f,
            "valid:{} pinCnt:{} dirty:{} refbit:{}",
            self.valid, self.pin_count, self.is_dirty, self.ref_bit
        )
    }
}
