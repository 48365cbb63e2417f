use std::collections::{hash_map::Entry, HashMap};

use crate::{
    buffer::{
        error::{BufferError, Result},
        frame::FrameId,
    },
    storage::{disk::FileId, page::page::PageId},
};

/// Maps a resident `(file, page)` to the frame holding it.
pub struct PageIndex {
    table: HashMap<(FileId, PageId), FrameId>,
}

impl PageIndex {
    /// Sized with 20% head room over the number of frames.
    pub fn with_frames(num_frames: usize) -> Self {
        PageIndex {
            table: HashMap::with_capacity(num_frames * 6 / 5 + 1),
        }
    }

    pub fn insert(&mut self, file_id: FileId, page_id: PageId, frame_id: FrameId) -> Result<()> {
        match self.table.entry((file_id, page_id)) {
            Entry::Occupied(entry) => Err(BufferError::AlreadyMapped {
                file_id,
                page_no: page_id,
                frame_id: *entry.get(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(frame_id);
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, file_id: FileId, page_id: PageId) -> Option<FrameId> {
        self.table.remove(&(file_id, page_id))
    }

    pub fn lookup(&self, file_id: FileId, page_id: PageId) -> Option<FrameId> {
        self.table.get(&(file_id, page_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((FileId, PageId), FrameId)> + '_ {
        self.table.iter().map(|(key, frame_id)| (*key, *frame_id))
    }
}

#[cfg(test)]
pub mod test {
    use super::PageIndex;
    use crate::buffer::error::BufferError;

    #[test]
    fn page_index_test() {
        let mut index = PageIndex::with_frames(4);
        assert!(index.is_empty());

        index.insert(1, 0, 0).unwrap();
        index.insert(1, 1, 2).unwrap();
        index.insert(2, 0, 3).unwrap();
        assert_eq!(index.len(), 3);

        // Frame zero is a real answer, not absence
        assert_eq!(index.lookup(1, 0), Some(0));
        assert_eq!(index.lookup(1, 1), Some(2));
        assert_eq!(index.lookup(2, 0), Some(3));
        assert_eq!(index.lookup(2, 1), None);

        assert_eq!(index.remove(1, 0), Some(0));
        assert_eq!(index.lookup(1, 0), None);
        assert_eq!(index.remove(1, 0), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn duplicate_insert_is_rejected_test() {
        let mut index = PageIndex::with_frames(2);
        index.insert(7, 9, 1).unwrap();

        match index.insert(7, 9, 0) {
            Err(BufferError::AlreadyMapped {
                file_id,
                page_no,
                frame_id,
            }) => {
                assert_eq!((file_id, page_no, frame_id), (7, 9, 1));
            }
            other => panic!("expected AlreadyMapped, got {:?}", other),
        }

        // Original mapping survives
        assert_eq!(index.lookup(7, 9), Some(1));
    }
}
