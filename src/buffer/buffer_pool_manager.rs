use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    buffer::{
        error::{BufferError, Result},
        frame::{FrameHeader, FrameId, FrameSnapshot},
        page_index::PageIndex,
    },
    config::BufferConfig,
    storage::{
        disk::{FileRef, PageFile},
        page::page::{Page, PageId},
    },
    utils::replacer::{ClockReplacer, Victim},
};

/// A buffer pool shared between threads. The mutex is the single critical
/// section covering lookups, pin counts, victim selection and the I/O done on
/// their behalf.
pub type SharedBufferPool = Arc<Mutex<BufferPoolManager>>;

/// Storage traffic and hit counters since construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub hits: u64,
    pub reads: u64,
    pub writes: u64,
    pub evictions: u64,
}

/// Fixed-size page cache over any number of [`PageFile`]s with clock
/// replacement.
///
/// Every successful [`fetch_page`](Self::fetch_page) and
/// [`allocate_page`](Self::allocate_page) pins the page once and must be matched
/// by exactly one [`unpin_page`](Self::unpin_page). Pinned pages are never
/// evicted. Dropping the manager writes every dirty page back.
///
/// [`PageFile`]: crate::storage::disk::PageFile
pub struct BufferPoolManager {
    num_frames: usize,

    // The frame headers of the frames that this buffer pool manages.
    // Index-aligned with `pool`.
    frames: Vec<FrameHeader>,
    pool: Vec<Page>,

    // (file, page) -> frame for every valid frame, and nothing else
    page_index: PageIndex,

    replacer: ClockReplacer,

    stats: BufferStats,
}

impl BufferPoolManager {
    /// # Panics
    ///
    /// Panics if `num_frames` is zero.
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "buffer pool needs at least one frame");

        let frames = (0..num_frames as FrameId).map(FrameHeader::new).collect();
        let pool = (0..num_frames).map(|_| Page::default()).collect();

        debug!(num_frames, "created buffer pool");

        Self {
            num_frames,
            frames,
            pool,
            page_index: PageIndex::with_frames(num_frames),
            replacer: ClockReplacer::new(num_frames),
            stats: BufferStats::default(),
        }
    }

    pub fn from_config(config: &BufferConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::new(config.num_frames))
    }

    pub fn into_shared(self) -> SharedBufferPool {
        Arc::new(Mutex::new(self))
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    /// Pins `page_no` of `file`, reading it from storage on a miss.
    ///
    /// On failure no pin is taken.
    pub fn fetch_page(&mut self, file: &FileRef, page_no: PageId) -> Result<&mut Page> {
        let frame_id = match self.page_index.lookup(file.file_id(), page_no) {
            Some(frame_id) => {
                let frame = &mut self.frames[frame_id as usize];
                frame.ref_bit = true;
                let pin_count = frame.pin();
                self.stats.hits += 1;

                trace!(file = %file.filename(), page_no, frame_id, pin_count, "buffer hit");
                frame_id
            }
            None => self.load_page(file, page_no)?,
        };

        Ok(&mut self.pool[frame_id as usize])
    }

    /// Drops one pin on `page_no` of `file`, marking it dirty if asked.
    ///
    /// Dirty is sticky: unpinning with `dirty == false` never cleans a page. A
    /// page that is not resident is ignored.
    pub fn unpin_page(&mut self, file: &FileRef, page_no: PageId, dirty: bool) -> Result<()> {
        let Some(frame_id) = self.page_index.lookup(file.file_id(), page_no) else {
            trace!(file = %file.filename(), page_no, "unpin of non-resident page ignored");
            return Ok(());
        };

        let frame = &mut self.frames[frame_id as usize];
        let pin_count = frame.unpin().ok_or_else(|| BufferError::PageNotPinned {
            file: file.filename(),
            page_no,
            frame_id,
        })?;
        if dirty {
            frame.is_dirty = true;
        }

        trace!(file = %file.filename(), page_no, frame_id, pin_count, dirty, "unpinned");
        Ok(())
    }

    /// Allocates a fresh page in `file` and returns it pinned in the pool.
    ///
    /// If the pool is exhausted the page stays allocated in the file.
    pub fn allocate_page(&mut self, file: &FileRef) -> Result<(PageId, &mut Page)> {
        let page_no = file.allocate_page()?.page_number();
        debug!(file = %file.filename(), page_no, "allocated page");

        let page = self.fetch_page(file, page_no)?;
        Ok((page_no, page))
    }

    /// Writes back and evicts every resident page of `file`, in frame order.
    ///
    /// Stops at the first pinned page with [`BufferError::PagePinned`]; pages
    /// in earlier frames stay flushed and evicted.
    pub fn flush_file(&mut self, file: &FileRef) -> Result<()> {
        let file_id = file.file_id();
        let mut flushed = 0;

        for frame_id in 0..self.num_frames as FrameId {
            let frame = &self.frames[frame_id as usize];
            if !frame.owned_by(file_id) {
                continue;
            }

            if frame.pin_count > 0 {
                return Err(BufferError::PagePinned {
                    file: file.filename(),
                    page_no: frame.page_id,
                    frame_id,
                });
            }
            if !frame.valid {
                return Err(BufferError::InconsistentFrame {
                    frame_id,
                    dirty: frame.is_dirty,
                    valid: frame.valid,
                    ref_bit: frame.ref_bit,
                });
            }

            let page_id = frame.page_id;
            self.write_back(frame_id)?;
            self.page_index.remove(file_id, page_id);
            self.frames[frame_id as usize].clear();
            flushed += 1;
        }

        debug!(file = %file.filename(), flushed, "flushed file");
        Ok(())
    }

    /// Drops `page_no` from the pool, pinned or not, without writing it back,
    /// then deletes it from `file`.
    pub fn dispose_page(&mut self, file: &FileRef, page_no: PageId) -> Result<()> {
        if let Some(frame_id) = self.page_index.remove(file.file_id(), page_no) {
            let frame = &mut self.frames[frame_id as usize];
            if frame.pin_count > 0 {
                warn!(
                    file = %file.filename(),
                    page_no,
                    frame_id,
                    pin_count = frame.pin_count,
                    "disposing pinned page"
                );
            }
            frame.clear();
        }

        file.delete_page(page_no)?;
        debug!(file = %file.filename(), page_no, "disposed page");
        Ok(())
    }

    /// Writes every dirty resident page back without evicting anything.
    pub fn flush_all(&mut self) -> Result<()> {
        for frame_id in 0..self.num_frames as FrameId {
            if self.frames[frame_id as usize].valid {
                self.write_back(frame_id)?;
            }
        }
        Ok(())
    }

    pub fn pin_count(&self, file: &FileRef, page_no: PageId) -> Option<u32> {
        self.page_index
            .lookup(file.file_id(), page_no)
            .map(|frame_id| self.frames[frame_id as usize].pin_count)
    }

    pub fn is_resident(&self, file: &FileRef, page_no: PageId) -> bool {
        self.page_index.lookup(file.file_id(), page_no).is_some()
    }

    pub fn num_valid_frames(&self) -> usize {
        self.frames.iter().filter(|frame| frame.valid).count()
    }

    pub fn describe(&self) -> PoolSnapshot {
        PoolSnapshot {
            frames: self.frames.iter().map(FrameHeader::snapshot).collect(),
        }
    }

    fn load_page(&mut self, file: &FileRef, page_no: PageId) -> Result<FrameId> {
        let frame_id = self.alloc_frame()?;
        let page = file.read_page(page_no)?;
        self.stats.reads += 1;

        let slot = frame_id as usize;
        self.pool[slot] = page;
        self.frames[slot].set(Arc::clone(file), page_no);
        if let Err(err) = self.page_index.insert(file.file_id(), page_no, frame_id) {
            self.frames[slot].clear();
            return Err(err);
        }

        debug!(file = %file.filename(), page_no, frame_id, "buffer miss, page loaded");
        Ok(frame_id)
    }

    fn alloc_frame(&mut self) -> Result<FrameId> {
        let Some(victim) = self.replacer.victim(&mut self.frames) else {
            debug!(num_frames = self.num_frames, "buffer pool exhausted");
            return Err(BufferError::BufferPoolExhausted);
        };

        if let Victim::Evict(frame_id) = victim {
            self.evict(frame_id)?;
        }
        Ok(victim.frame_id())
    }

    fn evict(&mut self, frame_id: FrameId) -> Result<()> {
        self.write_back(frame_id)?;

        let frame = &mut self.frames[frame_id as usize];
        if let Some(file_id) = frame.file_id() {
            self.page_index.remove(file_id, frame.page_id);
        }
        trace!(frame_id, page_id = frame.page_id, "evicted");
        frame.clear();
        self.stats.evictions += 1;
        Ok(())
    }

    // Writes the frame to its file if dirty. The frame stays dirty if the write fails.
    fn write_back(&mut self, frame_id: FrameId) -> Result<()> {
        let slot = frame_id as usize;
        let frame = &mut self.frames[slot];
        if !frame.is_dirty {
            return Ok(());
        }

        if let Some(file) = frame.file.as_ref() {
            file.write_page(&self.pool[slot])?;
            self.stats.writes += 1;
            debug!(file = %file.filename(), page_id = frame.page_id, frame_id, "wrote back dirty page");
        }
        frame.is_dirty = false;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn frames_mut(&mut self) -> &mut [FrameHeader] {
        &mut self.frames
    }

    /// Checks that valid frames and index entries are in one-to-one
    /// correspondence and that invalid frames are clean and unpinned.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        for frame in &self.frames {
            if frame.valid {
                let file_id = frame.file_id().expect("valid frame has a file");
                assert_eq!(
                    self.page_index.lookup(file_id, frame.page_id),
                    Some(frame.frame_id),
                    "frame {} missing from page index",
                    frame.frame_id
                );
            } else {
                assert_eq!(frame.pin_count, 0, "invalid frame {} pinned", frame.frame_id);
                assert!(!frame.is_dirty, "invalid frame {} dirty", frame.frame_id);
            }
        }

        for ((file_id, page_id), frame_id) in self.page_index.iter() {
            let frame = &self.frames[frame_id as usize];
            assert!(frame.valid, "index points at invalid frame {}", frame_id);
            assert!(frame.owned_by(file_id));
            assert_eq!(frame.page_id, page_id);
        }

        assert_eq!(self.page_index.len(), self.num_valid_frames());
    }
}

impl Drop for BufferPoolManager {
    // Unlike `flush_all`, a failed write does not stop the remaining frames
    // from being written.
    fn drop(&mut self) {
        for frame_id in 0..self.num_frames as FrameId {
            if !self.frames[frame_id as usize].valid {
                continue;
            }

            if let Err(err) = self.write_back(frame_id) {
                let frame = &self.frames[frame_id as usize];
                warn!(
                    error = %err,
                    frame_id,
                    page_id = frame.page_id,
                    "failed to write back dirty page on shutdown"
                );
            }
        }
    }
}

/// Read-only listing of every frame, as returned by
/// [`BufferPoolManager::describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub frames: Vec<FrameSnapshot>,
}

impl PoolSnapshot {
    pub fn valid_frames(&self) -> usize {
        self.frames.iter().filter(|frame| frame.valid).count()
    }
}

impl fmt::Display for PoolSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            writeln!(f, "{}", frame)?;
        }
        write!(f, "Total Number of Valid Frames:{}", self.valid_frames())
    }
}
