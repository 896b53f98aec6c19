//! Builds database images in memory for tests.
//!
//! Only single-leaf tables are produced, plus placeholder interior and index
//! pages. Payloads that do not fit on their page spill into overflow chains
//! using the same split the file format prescribes.

#![allow(dead_code)]

use sqlite_reader::sqlite::core::varint::encode_varint;
use std::io::Write;
use tempfile::NamedTempFile;

pub const UTF8: u32 = 1;
pub const UTF16LE: u32 = 2;
pub const UTF16BE: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Null,
    Int(i64),
    Float(f64),
    Text(&'a str),
    Blob(&'a [u8]),
}

/// Encodes a record with UTF-8 text
pub fn record(values: &[Value]) -> Vec<u8> {
    record_with(values, UTF8)
}

pub fn record_with(values: &[Value], encoding: u32) -> Vec<u8> {
    let mut types = Vec::new();
    let mut body = Vec::new();

    for value in values {
        match *value {
            Value::Null => types.extend(encode_varint(0)),
            Value::Int(0) => types.extend(encode_varint(8)),
            Value::Int(1) => types.extend(encode_varint(9)),
            Value::Int(i) => {
                let (code, width) = int_serial_type(i);
                types.extend(encode_varint(code));
                body.extend_from_slice(&i.to_be_bytes()[8 - width..]);
            }
            Value::Float(f) => {
                types.extend(encode_varint(7));
                body.extend_from_slice(&f.to_be_bytes());
            }
            Value::Text(s) => {
                let bytes = encode_text(s, encoding);
                types.extend(encode_varint(13 + 2 * bytes.len() as u64));
                body.extend(bytes);
            }
            Value::Blob(b) => {
                types.extend(encode_varint(12 + 2 * b.len() as u64));
                body.extend_from_slice(b);
            }
        }
    }

    let mut header_size = types.len() + 1;
    while encode_varint(header_size as u64).len() + types.len() != header_size {
        header_size = encode_varint(header_size as u64).len() + types.len();
    }

    let mut out = encode_varint(header_size as u64);
    out.extend(types);
    out.extend(body);
    out
}

fn int_serial_type(i: i64) -> (u64, usize) {
    if i8::try_from(i).is_ok() {
        (1, 1)
    } else if i16::try_from(i).is_ok() {
        (2, 2)
    } else if (-(1 << 23)..(1 << 23)).contains(&i) {
        (3, 3)
    } else if i32::try_from(i).is_ok() {
        (4, 4)
    } else if (-(1 << 47)..(1 << 47)).contains(&i) {
        (5, 6)
    } else {
        (6, 8)
    }
}

fn encode_text(s: &str, encoding: u32) -> Vec<u8> {
    match encoding {
        UTF16LE => s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect(),
        UTF16BE => s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect(),
        _ => s.as_bytes().to_vec(),
    }
}

/// In-page share of a table leaf payload
pub fn local_size(usable: usize, payload_len: usize) -> usize {
    let max_local = usable - 35;
    if payload_len <= max_local {
        return payload_len;
    }
    let min_local = (usable - 12) * 32 / 255 - 23;
    let surplus = min_local + (payload_len - min_local) % (usable - 4);
    if surplus <= max_local {
        surplus
    } else {
        min_local
    }
}

pub struct DbBuilder {
    page_size: usize,
    reserved: u8,
    encoding: u32,
    /// pages[0] is page 1, filled in by `build`
    pages: Vec<Vec<u8>>,
    schema: Vec<Vec<u8>>,
}

impl DbBuilder {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            reserved: 0,
            encoding: UTF8,
            pages: vec![vec![0; page_size]],
            schema: Vec::new(),
        }
    }

    pub fn reserved(mut self, reserved: u8) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn encoding(mut self, encoding: u32) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn usable_size(&self) -> usize {
        self.page_size - self.reserved as usize
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Adds a table whose rows are the given record payloads, row ids from 1
    pub fn add_table(&mut self, name: &str, rows: &[Vec<u8>]) -> u32 {
        let root = self.allocate();
        let cells: Vec<Vec<u8>> = rows
            .iter()
            .enumerate()
            .map(|(i, payload)| self.cell(i as i64 + 1, payload))
            .collect();
        self.pages[root as usize - 1] = self.leaf_page(0, &cells);

        let sql = format!("CREATE TABLE {}(id integer primary key, name text)", name);
        self.add_schema_row("table", name, name, root, Some(&sql));
        root
    }

    /// Adds a table whose root is an interior page
    pub fn add_interior_table(&mut self, name: &str) -> u32 {
        let root = self.allocate();
        let page = &mut self.pages[root as usize - 1];
        page[0] = 0x05;
        page[8..12].copy_from_slice(&root.to_be_bytes());

        let sql = format!("CREATE TABLE {}(id)", name);
        self.add_schema_row("table", name, name, root, Some(&sql));
        root
    }

    pub fn add_index(&mut self, name: &str, tbl_name: &str) -> u32 {
        let root = self.allocate();
        self.pages[root as usize - 1][0] = 0x0a;
        self.add_schema_row("index", name, tbl_name, root, None);
        root
    }

    pub fn add_view(&mut self, name: &str) {
        let sql = format!("CREATE VIEW {} AS SELECT 1", name);
        self.add_schema_row("view", name, name, 0, Some(&sql));
    }

    pub fn add_schema_row(
        &mut self,
        kind: &str,
        name: &str,
        tbl_name: &str,
        root: u32,
        sql: Option<&str>,
    ) {
        let payload = record_with(
            &[
                Value::Text(kind),
                Value::Text(name),
                Value::Text(tbl_name),
                Value::Int(root as i64),
                sql.map(Value::Text).unwrap_or(Value::Null),
            ],
            self.encoding,
        );
        self.schema.push(payload);
    }

    pub fn build(mut self) -> Vec<u8> {
        let schema = std::mem::take(&mut self.schema);
        let cells: Vec<Vec<u8>> = schema
            .iter()
            .enumerate()
            .map(|(i, payload)| self.cell(i as i64 + 1, payload))
            .collect();

        let mut page1 = self.leaf_page(100, &cells);
        page1[..100].copy_from_slice(&self.file_header());
        self.pages[0] = page1;
        self.pages.concat()
    }

    pub fn build_file(self) -> NamedTempFile {
        let image = self.build();
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(&image).expect("write database image");
        file.flush().expect("flush database image");
        file
    }

    fn allocate(&mut self) -> u32 {
        self.pages.push(vec![0; self.page_size]);
        self.pages.len() as u32
    }

    fn cell(&mut self, row_id: i64, payload: &[u8]) -> Vec<u8> {
        let usable = self.usable_size();
        let local = local_size(usable, payload.len());

        let mut cell = encode_varint(payload.len() as u64);
        cell.extend(encode_varint(row_id as u64));
        cell.extend_from_slice(&payload[..local]);

        if local < payload.len() {
            let chunks: Vec<&[u8]> = payload[local..].chunks(usable - 4).collect();
            let first = self.page_count() + 1;
            for (i, chunk) in chunks.iter().enumerate() {
                let page_num = self.allocate();
                let next = if i + 1 < chunks.len() { page_num + 1 } else { 0 };
                let page = &mut self.pages[page_num as usize - 1];
                page[..4].copy_from_slice(&next.to_be_bytes());
                page[4..4 + chunk.len()].copy_from_slice(chunk);
            }
            cell.extend_from_slice(&first.to_be_bytes());
        }

        cell
    }

    fn leaf_page(&self, header_offset: usize, cells: &[Vec<u8>]) -> Vec<u8> {
        let mut page = vec![0u8; self.page_size];
        let mut content_start = self.usable_size();
        let mut pointers = Vec::with_capacity(cells.len());

        for cell in cells {
            content_start -= cell.len();
            page[content_start..content_start + cell.len()].copy_from_slice(cell);
            pointers.push(content_start as u16);
        }

        page[header_offset] = 0x0d;
        page[header_offset + 3..header_offset + 5]
            .copy_from_slice(&(cells.len() as u16).to_be_bytes());
        page[header_offset + 5..header_offset + 7]
            .copy_from_slice(&((content_start % 65536) as u16).to_be_bytes());
        for (i, ptr) in pointers.iter().enumerate() {
            let offset = header_offset + 8 + 2 * i;
            page[offset..offset + 2].copy_from_slice(&ptr.to_be_bytes());
        }
        page
    }

    fn file_header(&self) -> [u8; 100] {
        let mut header = [0u8; 100];
        header[..16].copy_from_slice(b"SQLite format 3\0");
        let raw_size: u16 = if self.page_size == 65536 {
            1
        } else {
            self.page_size as u16
        };
        header[16..18].copy_from_slice(&raw_size.to_be_bytes());
        header[18] = 1;
        header[19] = 1;
        header[20] = self.reserved;
        header[21] = 64;
        header[22] = 32;
        header[23] = 32;
        header[24..28].copy_from_slice(&1u32.to_be_bytes());
        header[28..32].copy_from_slice(&self.page_count().to_be_bytes());
        header[44..48].copy_from_slice(&4u32.to_be_bytes());
        header[56..60].copy_from_slice(&self.encoding.to_be_bytes());
        header[92..96].copy_from_slice(&1u32.to_be_bytes());
        header[96..100].copy_from_slice(&3_045_001u32.to_be_bytes());
        header
    }
}

/// Overwrites the 4-byte next pointer at the start of an overflow page
pub fn set_next_overflow(image: &mut [u8], page_size: usize, page: u32, next: u32) {
    let offset = (page as usize - 1) * page_size;
    image[offset..offset + 4].copy_from_slice(&next.to_be_bytes());
}
