use std::{
    collections::VecDeque,
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, ReadBytesExt};
use hashlink::LinkedHashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{next_file_id, FileId, PageFile};
use crate::storage::page::page::{page_constants::PAGE_SIZE, Page, PageId, INVALID_PAGE_ID};

struct FileMetadata {
    // A mapping from page_id to its offset on disk
    // Deleted pages are kept as None so their slot can be handed out again
    pages: LinkedHashMap<PageId, Option<u64>>,

    // Slots of deleted pages, reused before the file grows
    free_slots: VecDeque<(PageId, u64)>,
}

impl FileMetadata {
    fn new() -> Self {
        FileMetadata {
            pages: LinkedHashMap::new(),
            free_slots: VecDeque::new(),
        }
    }

    fn offset_of(&self, page_id: PageId) -> io::Result<u64> {
        match self.pages.get(&page_id) {
            Some(Some(offset)) => Ok(*offset),
            Some(None) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("page {} has been deallocated", page_id),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("page {} has not been allocated", page_id),
            )),
        }
    }
}

struct Inner {
    db_io: File,
    meta: FileMetadata,
}

/// A single database file split into `PAGE_SIZE` slots; page `n` lives at
/// offset `n * PAGE_SIZE`.
///
/// Deleted slots are stamped with [`INVALID_PAGE_ID`] so reopening the file can
/// rebuild the free slot list.
pub struct DbFile {
    file_id: FileId,
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl DbFile {
    /// Creates a new, empty file. Fails if `path` already exists.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db_io = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        debug!(path = %path.display(), "created db file");
        Ok(Self::with_metadata(path, db_io, FileMetadata::new()))
    }

    /// Opens an existing file and rebuilds its page directory from the slot
    /// headers on disk.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut db_io = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_len = db_io.metadata()?.len();
        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} is {} bytes, not a whole number of pages",
                    path.display(),
                    file_len
                ),
            ));
        }

        let mut meta = FileMetadata::new();
        for slot in 0..file_len / PAGE_SIZE as u64 {
            let page_id = slot as PageId;
            let offset = slot * PAGE_SIZE as u64;

            db_io.seek(SeekFrom::Start(offset))?;
            if db_io.read_u32::<LittleEndian>()? == INVALID_PAGE_ID {
                meta.pages.insert(page_id, None);
                meta.free_slots.push_back((page_id, offset));
            } else {
                meta.pages.insert(page_id, Some(offset));
            }
        }

        debug!(
            path = %path.display(),
            pages = meta.pages.len(),
            free = meta.free_slots.len(),
            "opened db file"
        );
        Ok(Self::with_metadata(path, db_io, meta))
    }

    fn with_metadata(path: PathBuf, db_io: File, meta: FileMetadata) -> Self {
        DbFile {
            file_id: next_file_id(),
            path,
            inner: Mutex::new(Inner { db_io, meta }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live (allocated and not deleted) pages.
    pub fn num_pages(&self) -> usize {
        let inner = self.inner.lock();
        inner.meta.pages.values().filter(|slot| slot.is_some()).count()
    }

    fn write_at(db_io: &mut File, offset: u64, page: &Page) -> io::Result<()> {
        db_io.seek(SeekFrom::Start(offset))?;
        db_io.write_all(page.as_bytes())?;
        db_io.sync_data()
    }
}

impl PageFile for DbFile {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn filename(&self) -> String {
        self.path.display().to_string()
    }

    fn read_page(&self, page_no: PageId) -> io::Result<Page> {
        let mut inner = self.inner.lock();
        let offset = inner.meta.offset_of(page_no)?;

        let mut page = Page::default();
        inner.db_io.seek(SeekFrom::Start(offset))?;
        inner.db_io.read_exact(page.as_bytes_mut())?;

        Ok(page)
    }

    fn write_page(&self, page: &Page) -> io::Result<()> {
        let mut inner = self.inner.lock();
        let offset = inner.meta.offset_of(page.page_number())?;

        Self::write_at(&mut inner.db_io, offset, page)
    }

    fn allocate_page(&self) -> io::Result<Page> {
        let mut inner = self.inner.lock();

        let (page_id, offset) = match inner.meta.free_slots.pop_front() {
            Some(slot) => slot,
            None => {
                let page_id = inner.meta.pages.len() as PageId;
                (page_id, page_id as u64 * PAGE_SIZE as u64)
            }
        };

        let page = Page::new(page_id);
        if let Err(err) = Self::write_at(&mut inner.db_io, offset, &page) {
            // Give the slot back if it was a recycled one
            if inner.meta.pages.contains_key(&page_id) {
                inner.meta.free_slots.push_front((page_id, offset));
            }
            return Err(err);
        }
        inner.meta.pages.replace(page_id, Some(offset));

        debug!(file = %self.path.display(), page_id, "allocated page");
        Ok(page)
    }

    fn delete_page(&self, page_no: PageId) -> io::Result<()> {
        let mut inner = self.inner.lock();
        let offset = inner.meta.offset_of(page_no)?;

        Self::write_at(&mut inner.db_io, offset, &Page::default())?;
        inner.meta.pages.replace(page_no, None);
        inner.meta.free_slots.push_front((page_no, offset));

        debug!(file = %self.path.display(), page_id = page_no, "deleted page");
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use std::io;

    use super::DbFile;
    use crate::storage::disk::PageFile;

    #[test]
    fn db_io_test() {
        let dir = tempfile::tempdir().unwrap();
        let file = DbFile::create(dir.path().join("0.bin")).unwrap();

        let mut page = file.allocate_page().unwrap();
        assert_eq!(page.page_number(), 0);

        page.payload_mut().fill(1);
        file.write_page(&page).unwrap();

        let read_back = file.read_page(0).unwrap();
        assert_eq!(read_back, page, "Page read mismatch!");
    }

    #[test]
    fn create_refuses_existing_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.bin");

        DbFile::create(&path).unwrap();
        let err = DbFile::create(&path).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn deleted_slot_is_recycled_test() {
        let dir = tempfile::tempdir().unwrap();
        let file = DbFile::create(dir.path().join("0.bin")).unwrap();

        for expected in 0..3 {
            assert_eq!(file.allocate_page().unwrap().page_number(), expected);
        }

        file.delete_page(1).unwrap();
        assert_eq!(file.num_pages(), 2);
        assert_eq!(
            file.read_page(1).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert!(file.delete_page(1).is_err());

        let reused = file.allocate_page().unwrap();
        assert_eq!(reused.page_number(), 1);
        assert_eq!(file.allocate_page().unwrap().page_number(), 3);
        assert_eq!(file.num_pages(), 4);
    }

    #[test]
    fn unallocated_page_test() {
        let dir = tempfile::tempdir().unwrap();
        let file = DbFile::create(dir.path().join("0.bin")).unwrap();

        assert_eq!(
            file.read_page(5).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );

        let mut stray = crate::storage::page::page::Page::new(5);
        stray.payload_mut()[0] = 1;
        assert!(file.write_page(&stray).is_err());
    }

    #[test]
    fn reopen_rebuilds_directory_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.bin");

        {
            let file = DbFile::create(&path).unwrap();
            for _ in 0..4 {
                let mut page = file.allocate_page().unwrap();
                let page_no = page.page_number();
                page.write_payload(0, format!("page {}", page_no).as_bytes())
                    .unwrap();
                file.write_page(&page).unwrap();
            }
            file.delete_page(2).unwrap();
        }

        let file = DbFile::open(&path).unwrap();
        assert_eq!(file.num_pages(), 3);
        assert!(file.read_page(2).is_err());

        let page = file.read_page(3).unwrap();
        assert_eq!(page.read_payload(0, 6), Some(&b"page 3"[..]));

        // The tombstoned slot is handed out first
        assert_eq!(file.allocate_page().unwrap().page_number(), 2);
    }
}
