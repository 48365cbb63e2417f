use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use page_constants::{PAGE_NUMBER_OFFSET, PAGE_SIZE, PAYLOAD_OFFSET, PAYLOAD_SIZE};

pub type PageId = u32;

// Header value of a page slot that holds no live page
pub const INVALID_PAGE_ID: PageId = PageId::MAX;

pub mod page_constants {
    // Size
    pub const PAGE_SIZE: usize = 1024 * 4;

    // Offsets
    // The page number is the only header field the buffer layer relies on
    pub const PAGE_NUMBER_OFFSET: usize = 0;
    pub const PAGE_NUMBER_SIZE: usize = 4;
    pub const PAYLOAD_OFFSET: usize = PAGE_NUMBER_OFFSET + PAGE_NUMBER_SIZE;

    pub const PAYLOAD_SIZE: usize = PAGE_SIZE - PAYLOAD_OFFSET;
}

/// A fixed-size block of bytes as stored on disk and held in a buffer frame.
///
/// The first four bytes carry the page number (little endian). Everything after
/// them is payload owned by whoever pins the page.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    pub fn new(page_no: PageId) -> Self {
        let mut page = Page {
            data: Box::new([0; PAGE_SIZE]),
        };
        page.set_page_number(page_no);
        page
    }

    pub fn page_number(&self) -> PageId {
        LittleEndian::read_u32(&self.data[PAGE_NUMBER_OFFSET..PAYLOAD_OFFSET])
    }

    pub(crate) fn set_page_number(&mut self, page_no: PageId) {
        LittleEndian::write_u32(&mut self.data[PAGE_NUMBER_OFFSET..PAYLOAD_OFFSET], page_no);
    }

    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[PAYLOAD_OFFSET..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data[PAYLOAD_OFFSET..]
    }

    /// Copies `src` into the payload at `offset` and returns the offset just past
    /// the written bytes, or `None` if it would run off the end of the page.
    pub fn write_payload(&mut self, offset: usize, src: &[u8]) -> Option<usize> {
        let end = offset.checked_add(src.len())?;
        if end > PAYLOAD_SIZE {
            return None;
        }

        self.payload_mut()[offset..end].copy_from_slice(src);
        Some(end)
    }

    pub fn read_payload(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.payload().get(offset..end)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(INVALID_PAGE_ID)
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_number", &self.page_number())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub mod test {
    use super::{page_constants::PAYLOAD_SIZE, Page, INVALID_PAGE_ID};

    #[test]
    fn page_number_header_test() {
        let mut page = Page::new(42);
        assert_eq!(page.page_number(), 42);
        assert_eq!(&page.as_bytes()[..4], &42u32.to_le_bytes());

        page.set_page_number(7);
        assert_eq!(page.page_number(), 7);
        assert!(page.payload().iter().all(|byte| *byte == 0));

        assert_eq!(Page::default().page_number(), INVALID_PAGE_ID);
    }

    #[test]
    fn payload_bounds_test() {
        let mut page = Page::new(1);

        assert_eq!(page.write_payload(0, b"geode"), Some(5));
        assert_eq!(page.read_payload(0, 5), Some(&b"geode"[..]));

        // Header is untouched by payload writes
        assert_eq!(page.page_number(), 1);

        assert_eq!(page.write_payload(PAYLOAD_SIZE - 2, b"abc"), None);
        assert_eq!(page.write_payload(PAYLOAD_SIZE - 3, b"abc"), Some(PAYLOAD_SIZE));
        assert!(page.read_payload(PAYLOAD_SIZE, 1).is_none());
        assert!(page.read_payload(usize::MAX, 2).is_none());
    }
}
