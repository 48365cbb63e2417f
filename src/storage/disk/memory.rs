use std::{
    collections::{HashMap, VecDeque},
    io,
};

use parking_lot::Mutex;

use super::{next_file_id, FileId, PageFile};
use crate::storage::page::page::{Page, PageId};

#[derive(Default)]
struct Inner {
    pages: HashMap<PageId, Page>,
    free_ids: VecDeque<PageId>,
    next_page_id: PageId,

    // Every successful write, in order, by page number
    write_log: Vec<PageId>,
    num_reads: usize,
    num_deletes: usize,

    fail_reads: bool,
    fail_writes: bool,
}

/// A [`PageFile`] kept entirely in memory.
///
/// Besides storing pages it records how it was used, which lets tests observe
/// exactly when the buffer pool touches storage. Reads and writes can be made
/// to fail to exercise error propagation.
pub struct MemFile {
    file_id: FileId,
    name: String,
    inner: Mutex<Inner>,
}

impl MemFile {
    pub fn new(name: impl Into<String>) -> Self {
        MemFile {
            file_id: next_file_id(),
            name: name.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn num_reads(&self) -> usize {
        self.inner.lock().num_reads
    }

    pub fn num_writes(&self) -> usize {
        self.inner.lock().write_log.len()
    }

    pub fn num_deletes(&self) -> usize {
        self.inner.lock().num_deletes
    }

    /// Page numbers of all writes so far, oldest first.
    pub fn write_log(&self) -> Vec<PageId> {
        self.inner.lock().write_log.clone()
    }

    pub fn contains(&self, page_no: PageId) -> bool {
        self.inner.lock().pages.contains_key(&page_no)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    fn not_found(&self, page_no: PageId) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("page {} not allocated in {}", page_no, self.name),
        )
    }
}

impl PageFile for MemFile {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn filename(&self) -> String {
        self.name.clone()
    }

    fn read_page(&self, page_no: PageId) -> io::Result<Page> {
        let mut inner = self.inner.lock();
        if inner.fail_reads {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }

        let page = inner
            .pages
            .get(&page_no)
            .cloned()
            .ok_or_else(|| self.not_found(page_no))?;
        inner.num_reads += 1;
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }

        let page_no = page.page_number();
        match inner.pages.get_mut(&page_no) {
            Some(slot) => slot.clone_from(page),
            None => return Err(self.not_found(page_no)),
        }
        inner.write_log.push(page_no);
        Ok(())
    }

    fn allocate_page(&self) -> io::Result<Page> {
        let mut inner = self.inner.lock();

        let page_id = match inner.free_ids.pop_front() {
            Some(page_id) => page_id,
            None => {
                let page_id = inner.next_page_id;
                inner.next_page_id += 1;
                page_id
            }
        };

        let page = Page::new(page_id);
        inner.pages.insert(page_id, page.clone());
        Ok(page)
    }

    fn delete_page(&self, page_no: PageId) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.pages.remove(&page_no).is_none() {
            return Err(self.not_found(page_no));
        }

        inner.free_ids.push_back(page_no);
        inner.num_deletes += 1;
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use super::MemFile;
    use crate::storage::disk::PageFile;

    #[test]
    fn counts_reads_and_writes() {
        let file = MemFile::new("mem");

        let mut page = file.allocate_page().unwrap();
        page.payload_mut()[0] = 7;
        file.write_page(&page).unwrap();
        file.write_page(&page).unwrap();

        assert_eq!(file.read_page(0).unwrap(), page);
        assert_eq!(file.num_reads(), 1);
        assert_eq!(file.num_writes(), 2);
        assert_eq!(file.write_log(), vec![0, 0]);
    }

    #[test]
    fn injected_failures() {
        let file = MemFile::new("mem");
        let page = file.allocate_page().unwrap();

        file.set_fail_reads(true);
        assert!(file.read_page(0).is_err());
        assert_eq!(file.num_reads(), 0);

        file.set_fail_writes(true);
        assert!(file.write_page(&page).is_err());
        assert_eq!(file.num_writes(), 0);
    }

    #[test]
    fn delete_frees_the_page_id() {
        let file = MemFile::new("mem");
        file.allocate_page().unwrap();
        file.allocate_page().unwrap();

        file.delete_page(0).unwrap();
        assert!(!file.contains(0));
        assert!(file.delete_page(0).is_err());
        assert_eq!(file.allocate_page().unwrap().page_number(), 0);
        assert_eq!(file.allocate_page().unwrap().page_number(), 2);
        assert_eq!(file.num_deletes(), 1);
    }

    #[test]
    fn file_ids_are_distinct() {
        let a = MemFile::new("a");
        let b = MemFile::new("b");
        assert_ne!(a.file_id(), b.file_id());
        assert_eq!(a.filename(), "a");
    }
}
