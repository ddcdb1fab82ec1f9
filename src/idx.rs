//! Reader for the IDX binary tensor format (as used by MNIST).
//!
//! Only unsigned-byte tensors are supported:
//! - images: magic `0x00000803`, header `count, rows, cols`, then `count*rows*cols` bytes
//! - labels: magic `0x00000801`, header `count`, then `count` bytes
//!
//! All header fields are big-endian `u32`. Buffers are owned by the caller.

use std::fs;
use std::path::Path;

use log::debug;

use crate::{Error, Result};

pub const IMAGES_MAGIC: u32 = 0x0000_0803;
pub const LABELS_MAGIC: u32 = 0x0000_0801;

/// A `(count, rows, cols)` tensor of unsigned bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxImages {
    pub count: usize,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<u8>,
}

impl IdxImages {
    /// Bytes per image (`rows * cols`).
    #[inline]
    pub fn image_len(&self) -> usize {
        self.rows * self.cols
    }

    /// The `idx`-th image as a flat row-major slice.
    ///
    /// Panics if `idx >= count`.
    #[inline]
    pub fn image(&self, idx: usize) -> &[u8] {
        let len = self.image_len();
        &self.data[idx * len..(idx + 1) * len]
    }
}

/// A `(count,)` tensor of unsigned bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxLabels {
    pub data: Vec<u8>,
}

impl IdxLabels {
    #[inline]
    pub fn count(&self) -> usize {
        self.data.len()
    }
}

pub fn read_images(path: impl AsRef<Path>) -> Result<IdxImages> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let images = parse_images(&bytes)?;
    debug!(
        "read {} images of {}x{} from {}",
        images.count,
        images.rows,
        images.cols,
        path.display()
    );
    Ok(images)
}

pub fn read_labels(path: impl AsRef<Path>) -> Result<IdxLabels> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let labels = parse_labels(&bytes)?;
    debug!("read {} labels from {}", labels.count(), path.display());
    Ok(labels)
}

pub fn parse_images(bytes: &[u8]) -> Result<IdxImages> {
    let mut offset = 0;
    let magic = read_be_u32(bytes, &mut offset)?;
    if magic != IMAGES_MAGIC {
        return Err(Error::Idx(format!(
            "expected image magic {IMAGES_MAGIC:#010x}, found {magic:#010x}"
        )));
    }
    let count = read_be_u32(bytes, &mut offset)? as usize;
    let rows = read_be_u32(bytes, &mut offset)? as usize;
    let cols = read_be_u32(bytes, &mut offset)? as usize;

    let len = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| Error::Idx(format!("image tensor ({count}, {rows}, {cols}) is too large")))?;
    let data = take_payload(bytes, offset, len)?;

    Ok(IdxImages {
        count,
        rows,
        cols,
        data,
    })
}

pub fn parse_labels(bytes: &[u8]) -> Result<IdxLabels> {
    let mut offset = 0;
    let magic = read_be_u32(bytes, &mut offset)?;
    if magic != LABELS_MAGIC {
        return Err(Error::Idx(format!(
            "expected label magic {LABELS_MAGIC:#010x}, found {magic:#010x}"
        )));
    }
    let count = read_be_u32(bytes, &mut offset)? as usize;
    let data = take_payload(bytes, offset, count)?;
    Ok(IdxLabels { data })
}

fn read_be_u32(bytes: &[u8], offset: &mut usize) -> Result<u32> {
    let end = *offset + 4;
    let chunk = bytes
        .get(*offset..end)
        .ok_or_else(|| Error::Idx(format!("header truncated at byte {}", *offset)))?;
    *offset = end;
    Ok(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

fn take_payload(bytes: &[u8], offset: usize, len: usize) -> Result<Vec<u8>> {
    let available = bytes.len() - offset;
    if available < len {
        return Err(Error::Idx(format!(
            "payload truncated: expected {len} bytes, found {available}"
        )));
    }
    Ok(bytes[offset..offset + len].to_vec())
}
