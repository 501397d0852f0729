// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Binary framing of a persisted catalog image
//!
//! ```text
//! +-------+---------+-------+----------------+
//! | magic | version | crc32 | bincode image  |
//! | 4 B   | u16 LE  | u32 LE| ...            |
//! +-------+---------+-------+----------------+
//! ```
//! The checksum covers the payload only.

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::image::CatalogImage;

pub const MAGIC: &[u8; 4] = b"PCAT";
pub const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4;

pub fn encode_image(image: &CatalogImage) -> CatalogResult<Vec<u8>> {
    let payload = bincode::serialize(image)?;
    let mut blob = Vec::with_capacity(HEADER_LEN + payload.len());
    blob.extend_from_slice(MAGIC);
    blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    blob.extend_from_slice(&payload);
    Ok(blob)
}

pub fn decode_image(blob: &[u8]) -> CatalogResult<CatalogImage> {
    if blob.len() < HEADER_LEN {
        return Err(CatalogError::CorruptImage(format!(
            "blob of {} bytes is shorter than the header",
            blob.len()
        )));
    }
    let (header, payload) = blob.split_at(HEADER_LEN);
    if &header[0..4] != MAGIC {
        return Err(CatalogError::CorruptImage("bad magic".to_string()));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(CatalogError::CorruptImage(format!(
            "unsupported format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    let expected = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(CatalogError::CorruptImage(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            expected, actual
        )));
    }
    bincode::deserialize(payload)
        .map_err(|e| CatalogError::CorruptImage(format!("undecodable payload: {}", e)))
}
