//! In-process printable-string scanner.
//!
//! Finds maximal runs of printable ASCII and of UTF-16LE code units whose
//! high byte is zero. Works on any blob, PE or not.

use std::collections::HashSet;

fn is_printable(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7e | b'\t')
}

/// Every maximal printable run of at least `min_len` characters, lowercased.
pub fn scan_strings(data: &[u8], min_len: usize) -> HashSet<String> {
    let min_len = min_len.max(1);
    let mut found = HashSet::new();
    scan_ascii(data, min_len, &mut found);
    // Wide strings may start on either byte alignment.
    scan_wide(data, min_len, &mut found);
    if data.len() > 1 {
        scan_wide(&data[1..], min_len, &mut found);
    }
    found
}

fn scan_ascii(data: &[u8], min_len: usize, found: &mut HashSet<String>) {
    let mut run = Vec::new();
    for &byte in data {
        if is_printable(byte) {
            run.push(byte.to_ascii_lowercase());
        } else {
            flush(&mut run, min_len, found);
        }
    }
    flush(&mut run, min_len, found);
}

fn scan_wide(data: &[u8], min_len: usize, found: &mut HashSet<String>) {
    let mut run = Vec::new();
    for unit in data.chunks_exact(2) {
        if unit[1] == 0 && is_printable(unit[0]) {
            run.push(unit[0].to_ascii_lowercase());
        } else {
            flush(&mut run, min_len, found);
        }
    }
    flush(&mut run, min_len, found);
}

fn flush(run: &mut Vec<u8>, min_len: usize, found: &mut HashSet<String>) {
    if run.len() >= min_len {
        // Runs only ever hold printable ASCII.
        found.insert(String::from_utf8_lossy(run).into_owned());
    }
    run.clear();
}
