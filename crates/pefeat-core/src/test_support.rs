//! Minimal PE32 / PE32+ image builder for tests.
//!
//! Layout: headers in the first 0x200 bytes, one `.idata` section mapped at
//! RVA 0x1000 holding the import descriptor, lookup/address tables, the DLL
//! name, hint/name entries and finally an arbitrary payload.

use std::path::{Path, PathBuf};

const PE_OFFSET: usize = 0x80;
const OPTIONAL_HEADER: usize = PE_OFFSET + 4 + 20;
const OPTIONAL_HEADER_SIZE_32: usize = 0xE0;
const OPTIONAL_HEADER_SIZE_64: usize = 0xF0;
const HEADERS_SIZE: usize = 0x200;
const SECTION_RVA: u32 = 0x1000;
const FILE_ALIGNMENT: usize = 0x200;

pub(crate) struct PeFixture {
    dll: String,
    names: Vec<String>,
    ordinals: Vec<u16>,
    payload: Vec<u8>,
    is_64: bool,
    security: Option<(u32, u32)>,
}

impl PeFixture {
    pub(crate) fn new() -> Self {
        Self {
            dll: "KERNEL32.dll".to_string(),
            names: Vec::new(),
            ordinals: Vec::new(),
            payload: Vec::new(),
            is_64: false,
            security: None,
        }
    }

    /// Emit a PE32+ (x86-64) image with 8-byte thunks.
    pub(crate) fn pe32_plus(mut self) -> Self {
        self.is_64 = true;
        self
    }

    /// Point the certificate-table data directory at `offset`/`size`.
    pub(crate) fn security_directory(mut self, offset: u32, size: u32) -> Self {
        self.security = Some((offset, size));
        self
    }

    pub(crate) fn import(mut self, name: &str) -> Self {
        self.names.push(name.to_string());
        self
    }

    pub(crate) fn ordinal(mut self, ordinal: u16) -> Self {
        self.ordinals.push(ordinal);
        self
    }

    pub(crate) fn payload(mut self, bytes: &[u8]) -> Self {
        self.payload.extend_from_slice(bytes);
        self
    }

    pub(crate) fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let has_imports = !self.names.is_empty() || !self.ordinals.is_empty();
        let section = if has_imports {
            self.import_section()
        } else {
            self.payload.clone()
        };
        let raw_size = align_up(section.len().max(1), FILE_ALIGNMENT);

        let mut image = vec![0u8; HEADERS_SIZE];
        self.write_headers(&mut image, raw_size, has_imports);
        image.extend_from_slice(&section);
        image.resize(HEADERS_SIZE + raw_size, 0);
        image
    }

    fn import_section(&self) -> Vec<u8> {
        let thunk_size = self.thunk_size();
        let table_len = (self.names.len() + self.ordinals.len() + 1) * thunk_size;

        // Import descriptor followed by the null terminator descriptor.
        let mut sec = vec![0u8; 40];
        let ilt = sec.len();
        sec.resize(ilt + table_len, 0);
        let iat = sec.len();
        sec.resize(iat + table_len, 0);

        let dll_name = sec.len();
        sec.extend_from_slice(self.dll.as_bytes());
        sec.push(0);
        pad_even(&mut sec);

        let mut thunks = Vec::new();
        for name in &self.names {
            thunks.push(u64::from(SECTION_RVA) + sec.len() as u64);
            sec.extend_from_slice(&0u16.to_le_bytes());
            sec.extend_from_slice(name.as_bytes());
            sec.push(0);
            pad_even(&mut sec);
        }
        let ordinal_flag = if self.is_64 { 1u64 << 63 } else { 1u64 << 31 };
        thunks.extend(self.ordinals.iter().map(|&o| ordinal_flag | u64::from(o)));

        for (i, &thunk) in thunks.iter().enumerate() {
            for table in [ilt, iat] {
                let at = table + i * thunk_size;
                if self.is_64 {
                    put_u64(&mut sec, at, thunk);
                } else {
                    put_u32(&mut sec, at, thunk as u32);
                }
            }
        }

        put_u32(&mut sec, 0, SECTION_RVA + ilt as u32);
        put_u32(&mut sec, 12, SECTION_RVA + dll_name as u32);
        put_u32(&mut sec, 16, SECTION_RVA + iat as u32);

        sec.extend_from_slice(&self.payload);
        sec
    }

    fn thunk_size(&self) -> usize {
        if self.is_64 {
            8
        } else {
            4
        }
    }

    fn write_headers(&self, image: &mut [u8], raw_size: usize, has_imports: bool) {
        image[0..2].copy_from_slice(b"MZ");
        put_u32(image, 0x3c, PE_OFFSET as u32);
        image[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");

        let (machine, characteristics, opt_size) = if self.is_64 {
            (0x8664, 0x0022, OPTIONAL_HEADER_SIZE_64)
        } else {
            (0x14c, 0x0102, OPTIONAL_HEADER_SIZE_32)
        };

        // COFF header
        let coff = PE_OFFSET + 4;
        put_u16(image, coff, machine);
        put_u16(image, coff + 2, 1);
        put_u16(image, coff + 16, opt_size as u16);
        put_u16(image, coff + 18, characteristics);

        // Optional header; PE32+ drops base_of_data and widens image_base
        // and the stack/heap sizes, shifting the data directories.
        let opt = OPTIONAL_HEADER;
        put_u32(image, opt + 16, SECTION_RVA);
        put_u32(image, opt + 20, SECTION_RVA);
        let data_directories = if self.is_64 {
            put_u16(image, opt, 0x20b);
            put_u64(image, opt + 24, 0x1_4000_0000);
            put_u32(image, opt + 108, 16);
            opt + 112
        } else {
            put_u16(image, opt, 0x10b);
            put_u32(image, opt + 28, 0x0040_0000);
            put_u32(image, opt + 92, 16);
            opt + 96
        };
        put_u32(image, opt + 32, 0x1000);
        put_u32(image, opt + 36, FILE_ALIGNMENT as u32);
        put_u16(image, opt + 40, 4);
        put_u16(image, opt + 48, 4);
        put_u32(image, opt + 56, SECTION_RVA + align_up(raw_size, 0x1000) as u32);
        put_u32(image, opt + 60, HEADERS_SIZE as u32);
        put_u16(image, opt + 68, 3);

        if has_imports {
            put_u32(image, data_directories + 8, SECTION_RVA);
            put_u32(image, data_directories + 12, 40);
        }
        if let Some((offset, size)) = self.security {
            put_u32(image, data_directories + 32, offset);
            put_u32(image, data_directories + 36, size);
        }

        let sh = opt + opt_size;
        image[sh..sh + 8].copy_from_slice(b".idata\0\0");
        put_u32(image, sh + 8, raw_size as u32);
        put_u32(image, sh + 12, SECTION_RVA);
        put_u32(image, sh + 16, raw_size as u32);
        put_u32(image, sh + 20, HEADERS_SIZE as u32);
        put_u32(image, sh + 36, 0xC000_0040);
    }
}

/// UTF-16LE encoding of an ASCII string.
pub(crate) fn wide(text: &str) -> Vec<u8> {
    text.bytes().flat_map(|b| [b, 0]).collect()
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

fn pad_even(buf: &mut Vec<u8>) {
    if buf.len() % 2 == 1 {
        buf.push(0);
    }
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
