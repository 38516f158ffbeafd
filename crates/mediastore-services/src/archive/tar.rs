//! Minimal ustar encoder.
//!
//! Pure and offset driven: every function returns bytes and never touches I/O.
//! Only regular files are supported.

use thiserror::Error;

pub const BLOCK_SIZE: usize = 512;

/// Largest entry size representable in the 11 octal digit size field.
pub const MAX_ENTRY_SIZE: u64 = 0o77777777777;

const NAME: (usize, usize) = (0, 100);
const MODE: (usize, usize) = (100, 8);
const UID: (usize, usize) = (108, 8);
const GID: (usize, usize) = (116, 8);
const SIZE: (usize, usize) = (124, 12);
const MTIME: (usize, usize) = (136, 12);
const CHECKSUM: (usize, usize) = (148, 8);
const TYPEFLAG: usize = 156;
const MAGIC: (usize, usize) = (257, 6);
const VERSION: (usize, usize) = (263, 2);

const FILE_MODE: u64 = 0o644;
const REGULAR_FILE: u8 = b'0';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TarError {
    #[error("Entry name is empty")]
    EmptyName,

    #[error("Entry name longer than 100 bytes: {0}")]
    NameTooLong(String),

    #[error("Entry of {0} bytes exceeds the tar size field")]
    TooLarge(u64),
}

/// Write `value` as zero-padded octal filling `width - 1` digits, then NUL.
fn write_octal(block: &mut [u8; BLOCK_SIZE], (offset, width): (usize, usize), value: u64) {
    let digits = format!("{:0>width$o}", value, width = width - 1);
    block[offset..offset + width - 1].copy_from_slice(digits.as_bytes());
    block[offset + width - 1] = 0;
}

/// Unsigned byte sum of a header with its checksum field read as spaces.
pub fn checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    let (offset, width) = CHECKSUM;
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if (offset..offset + width).contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(b)
            }
        })
        .sum()
}

/// Header block for a regular file entry.
pub fn header(name: &str, size: u64, mtime: u64) -> Result<[u8; BLOCK_SIZE], TarError> {
    if name.is_empty() {
        return Err(TarError::EmptyName);
    }
    if name.len() > NAME.1 {
        return Err(TarError::NameTooLong(name.to_string()));
    }
    if size > MAX_ENTRY_SIZE {
        return Err(TarError::TooLarge(size));
    }

    let mut block = [0u8; BLOCK_SIZE];
    block[NAME.0..NAME.0 + name.len()].copy_from_slice(name.as_bytes());
    write_octal(&mut block, MODE, FILE_MODE);
    write_octal(&mut block, UID, 0);
    write_octal(&mut block, GID, 0);
    write_octal(&mut block, SIZE, size);
    write_octal(&mut block, MTIME, mtime.min(MAX_ENTRY_SIZE));
    block[TYPEFLAG] = REGULAR_FILE;
    block[MAGIC.0..MAGIC.0 + MAGIC.1].copy_from_slice(b"ustar\0");
    block[VERSION.0..VERSION.0 + VERSION.1].copy_from_slice(b"00");

    let sum = format!("{:06o}\0 ", checksum(&block));
    block[CHECKSUM.0..CHECKSUM.0 + CHECKSUM.1].copy_from_slice(sum.as_bytes());
    Ok(block)
}

/// Zero bytes needed after `size` bytes of data to reach a block boundary.
pub fn padding(size: u64) -> usize {
    let rem = (size % BLOCK_SIZE as u64) as usize;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE - rem
    }
}

/// Two zero blocks.
pub fn end_of_archive() -> [u8; 2 * BLOCK_SIZE] {
    [0u8; 2 * BLOCK_SIZE]
}

/// One complete in-memory entry: header, data and padding.
pub fn entry(name: &str, data: &[u8], mtime: u64) -> Result<Vec<u8>, TarError> {
    let header = header(name, data.len() as u64, mtime)?;
    let mut out = Vec::with_capacity(BLOCK_SIZE + data.len() + BLOCK_SIZE);
    out.extend_from_slice(&header);
    out.extend_from_slice(data);
    out.resize(out.len() + padding(data.len() as u64), 0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn field(block: &[u8], (offset, width): (usize, usize)) -> &[u8] {
        &block[offset..offset + width]
    }

    #[test]
    fn test_header_layout() {
        let block = header("cat.jpg", 1234, 1_700_000_000).unwrap();

        assert_eq!(&field(&block, NAME)[..7], b"cat.jpg");
        assert!(field(&block, NAME)[7..].iter().all(|&b| b == 0));
        assert_eq!(field(&block, MODE), b"0000644\0");
        assert_eq!(field(&block, UID), b"0000000\0");
        assert_eq!(field(&block, SIZE), b"00000002322\0");
        assert_eq!(field(&block, MTIME), format!("{:011o}\0", 1_700_000_000u64).as_bytes());
        assert_eq!(block[TYPEFLAG], b'0');
        assert_eq!(field(&block, MAGIC), b"ustar\0");
    }

    #[test]
    fn test_checksum_field_matches_sum() {
        let block = header("report.pdf", 99, 0).unwrap();
        let stored = field(&block, CHECKSUM);
        assert_eq!(stored[6], 0);
        assert_eq!(stored[7], b' ');

        let digits = std::str::from_utf8(&stored[..6]).unwrap();
        let value = u32::from_str_radix(digits, 8).unwrap();
        assert_eq!(value, checksum(&block));
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 511);
        assert_eq!(padding(512), 0);
        assert_eq!(padding(513), 511);
        assert_eq!(entry("a", &[1; 700], 0).unwrap().len(), 3 * BLOCK_SIZE);
    }

    #[test]
    fn test_rejects_bad_entries() {
        assert_eq!(header("", 1, 0), Err(TarError::EmptyName));
        let long = "x".repeat(101);
        assert!(matches!(header(&long, 1, 0), Err(TarError::NameTooLong(_))));
        assert_eq!(
            header("big", MAX_ENTRY_SIZE + 1, 0),
            Err(TarError::TooLarge(MAX_ENTRY_SIZE + 1))
        );
    }

    #[test]
    fn test_readable_by_tar_crate() {
        let mut archive = Vec::new();
        archive.extend(entry("one.txt", b"first file", 1_600_000_000).unwrap());
        archive.extend(entry("two.bin", &[9u8; 1024], 1_600_000_000).unwrap());
        archive.extend_from_slice(&end_of_archive());
        assert_eq!(archive.len() % BLOCK_SIZE, 0);

        let mut reader = ::tar::Archive::new(archive.as_slice());
        let mut seen = Vec::new();
        for file in reader.entries().unwrap() {
            let mut file = file.unwrap();
            let name = file.path().unwrap().to_string_lossy().into_owned();
            let mut body = Vec::new();
            file.read_to_end(&mut body).unwrap();
            seen.push((name, body.len()));
        }
        assert_eq!(
            seen,
            vec![("one.txt".to_string(), 10), ("two.bin".to_string(), 1024)]
        );
    }
}
