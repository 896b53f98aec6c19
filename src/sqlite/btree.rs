use crate::sqlite::core::header::{be_u32, DatabaseHeader};
use crate::sqlite::core::varint::Varint;
use crate::sqlite::error::{SqliteError, SqliteResult};
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Kind of b-tree page, from the first byte of the page header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    InteriorIndex,
    InteriorTable,
    LeafIndex,
    LeafTable,
}

impl PageType {
    fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(PageType::InteriorIndex),
            0x05 => Some(PageType::InteriorTable),
            0x0a => Some(PageType::LeafIndex),
            0x0d => Some(PageType::LeafTable),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            PageType::InteriorIndex => 0x02,
            PageType::InteriorTable => 0x05,
            PageType::LeafIndex => 0x0a,
            PageType::LeafTable => 0x0d,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PageType::LeafIndex | PageType::LeafTable)
    }
}

/// Represents a B-tree page header
///
/// ## B-tree Page Header Format
///
/// - Byte 0: Page type
/// - Bytes 1-2: First freeblock offset
/// - Bytes 3-4: Number of cells
/// - Bytes 5-6: Cell content offset
/// - Byte 7: Number of fragmented free bytes
/// - Bytes 8-11: Right-most child pointer (interior pages only)
#[derive(Debug, Clone)]
pub struct BTreePageHeader {
    pub page_type: PageType,
    pub first_freeblock: u16,
    pub num_cells: u16,
    pub content_offset: u16,
    pub fragmented_free_bytes: u8,
    pub right_pointer: Option<u32>,
}

impl BTreePageHeader {
    const LEAF_HEADER_SIZE: usize = 8;
    const INTERIOR_HEADER_SIZE: usize = 12;

    /// Parse a B-tree page header from a byte slice
    pub fn parse(data: &[u8], page_num: u32) -> SqliteResult<Self> {
        if data.len() < Self::LEAF_HEADER_SIZE {
            return Err(SqliteError::corrupt(page_num, "page header too short"));
        }

        let page_type = PageType::from_byte(data[0]).ok_or_else(|| {
            SqliteError::corrupt(page_num, format!("invalid page type {:#04x}", data[0]))
        })?;

        let right_pointer = if page_type.is_leaf() {
            None
        } else {
            if data.len() < Self::INTERIOR_HEADER_SIZE {
                return Err(SqliteError::corrupt(page_num, "interior page header too short"));
            }
            Some(be_u32(data, 8))
        };

        Ok(Self {
            page_type,
            first_freeblock: u16::from_be_bytes([data[1], data[2]]),
            num_cells: u16::from_be_bytes([data[3], data[4]]),
            content_offset: u16::from_be_bytes([data[5], data[6]]),
            fragmented_free_bytes: data[7],
            right_pointer,
        })
    }

    /// Size of the header itself, 8 for leaf pages and 12 for interior pages
    pub fn size(&self) -> usize {
        if self.page_type.is_leaf() {
            Self::LEAF_HEADER_SIZE
        } else {
            Self::INTERIOR_HEADER_SIZE
        }
    }
}

/// A B-tree page loaded into memory
///
/// Page 1 carries the 100-byte database header before its own page header;
/// `header_offset` accounts for that.
#[derive(Debug)]
pub struct BTreePage {
    number: u32,
    data: Vec<u8>,
    header_offset: usize,
    header: BTreePageHeader,
}

impl BTreePage {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn header(&self) -> &BTreePageHeader {
        &self.header
    }

    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    pub fn num_cells(&self) -> u16 {
        self.header.num_cells
    }

    /// Gets raw page data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reads the cell pointer array, validating each offset against the page
    pub fn cell_pointers(&self, usable_size: usize) -> SqliteResult<Vec<usize>> {
        let array_start = self.header_offset + self.header.size();
        let array_end = array_start + 2 * self.header.num_cells as usize;
        if array_end > usable_size {
            return Err(SqliteError::corrupt(
                self.number,
                format!("{} cell pointers overflow the page", self.header.num_cells),
            ));
        }

        self.data[array_start..array_end]
            .chunks_exact(2)
            .map(|pair| {
                let ptr = u16::from_be_bytes([pair[0], pair[1]]) as usize;
                if ptr < array_end || ptr >= usable_size {
                    Err(SqliteError::corrupt(
                        self.number,
                        format!("cell pointer {} outside cell content area", ptr),
                    ))
                } else {
                    Ok(ptr)
                }
            })
            .collect()
    }
}

/// One row as stored in a table leaf page, payload fully reassembled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub row_id: i64,
    pub payload_len: u64,
    pub payload: Vec<u8>,
}

/// Reads pages and cells from a random-access byte source
pub struct PageReader<'a, R> {
    source: &'a mut R,
    header: &'a DatabaseHeader,
}

impl<'a, R: Read + Seek> PageReader<'a, R> {
    pub fn new(source: &'a mut R, header: &'a DatabaseHeader) -> Self {
        Self { source, header }
    }

    /// Reads a B-tree page and parses its header
    pub fn read_page(&mut self, page_num: u32) -> SqliteResult<BTreePage> {
        let data = self.read_raw_page(page_num)?;
        let header_offset = if page_num == 1 {
            DatabaseHeader::HEADER_SIZE
        } else {
            0
        };
        let header = BTreePageHeader::parse(&data[header_offset..], page_num)?;
        debug!(
            page = page_num,
            page_type = ?header.page_type,
            cells = header.num_cells,
            "Read b-tree page"
        );

        Ok(BTreePage {
            number: page_num,
            data,
            header_offset,
            header,
        })
    }

    /// Returns every cell of a table leaf page, in cell pointer order
    pub fn read_cells(&mut self, page_num: u32) -> SqliteResult<Vec<Cell>> {
        let page = self.read_page(page_num)?;
        if page.page_type() != PageType::LeafTable {
            return Err(SqliteError::UnsupportedPageType {
                page: page_num,
                page_type: page.page_type().as_byte(),
            });
        }

        let pointers = page.cell_pointers(self.header.usable_size())?;
        trace!("Cell pointers: {:?}", pointers);

        pointers
            .into_iter()
            .map(|ptr| self.read_cell(&page, ptr))
            .collect()
    }

    fn read_cell(&mut self, page: &BTreePage, ptr: usize) -> SqliteResult<Cell> {
        let usable_size = self.header.usable_size();
        let content = &page.data()[..usable_size];

        let (payload_len, len_size) = content[ptr..].read_varint()?;
        let (row_id, id_size) = content[ptr + len_size..].read_varint()?;
        let payload_len = payload_len as u64;
        let start = ptr + len_size + id_size;

        let local = local_payload_size(usable_size, payload_len);
        let local_end = start + local;
        let pointer_end = if (local as u64) < payload_len {
            local_end + 4
        } else {
            local_end
        };
        if pointer_end > usable_size {
            return Err(SqliteError::corrupt(
                page.number(),
                format!("cell at offset {} runs past the page", ptr),
            ));
        }

        let mut payload = content[start..local_end].to_vec();
        if (local as u64) < payload_len {
            let first_overflow = be_u32(content, local_end);
            debug!(
                row_id,
                payload_len,
                local,
                first_overflow,
                "Following overflow chain"
            );
            self.read_overflow(page.number(), first_overflow, payload_len, &mut payload)?;
        }

        Ok(Cell {
            row_id,
            payload_len,
            payload,
        })
    }

    /// Appends overflow page contents to `payload` until it holds `payload_len` bytes
    fn read_overflow(
        &mut self,
        home_page: u32,
        first_page: u32,
        payload_len: u64,
        payload: &mut Vec<u8>,
    ) -> SqliteResult<()> {
        let chunk_size = self.header.usable_size() - 4;
        let mut visited = HashSet::new();
        let mut next = first_page;

        while (payload.len() as u64) < payload_len {
            if next == 0 {
                return Err(SqliteError::corrupt(
                    home_page,
                    format!(
                        "overflow chain ended after {} of {} payload bytes",
                        payload.len(),
                        payload_len
                    ),
                ));
            }
            if !visited.insert(next) {
                return Err(SqliteError::corrupt(
                    home_page,
                    format!("overflow chain revisits page {}", next),
                ));
            }

            let data = self.read_raw_page(next)?;
            let remaining = (payload_len - payload.len() as u64) as usize;
            let take = remaining.min(chunk_size);
            trace!(page = next, bytes = take, "Read overflow page");

            payload.extend_from_slice(&data[4..4 + take]);
            next = be_u32(&data, 0);
        }

        if next != 0 {
            return Err(SqliteError::corrupt(
                home_page,
                format!(
                    "overflow chain continues to page {} past the declared {} payload bytes",
                    next, payload_len
                ),
            ));
        }

        Ok(())
    }

    /// Reads the full bytes of one page
    fn read_raw_page(&mut self, page_num: u32) -> SqliteResult<Vec<u8>> {
        if page_num == 0 {
            return Err(SqliteError::corrupt(0, "page numbers start at 1"));
        }

        let page_size = self.header.page_size() as u64;
        let offset = (page_num as u64 - 1) * page_size;

        let file_len = self.source.seek(SeekFrom::End(0))?;
        if offset + page_size > file_len {
            return Err(SqliteError::corrupt(
                page_num,
                format!("page ends past end of file ({} bytes)", file_len),
            ));
        }

        let mut page = vec![0; page_size as usize];
        self.source.seek(SeekFrom::Start(offset))?;
        self.source.read_exact(&mut page)?;
        Ok(page)
    }
}

/// Number of payload bytes a table leaf cell keeps on its own page
///
/// Payloads up to `usable_size - 35` bytes are stored whole. Larger payloads
/// keep a prefix sized so the spilled remainder fills overflow pages as evenly
/// as the format allows.
pub fn local_payload_size(usable_size: usize, payload_len: u64) -> usize {
    let max_local = usable_size - 35;
    if payload_len <= max_local as u64 {
        return payload_len as usize;
    }

    let min_local = (usable_size - 12) * 32 / 255 - 23;
    let surplus = min_local as u64 + (payload_len - min_local as u64) % (usable_size as u64 - 4);
    if surplus <= max_local as u64 {
        surplus as usize
    } else {
        min_local
    }
}
