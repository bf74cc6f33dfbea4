//! EXIF metadata extraction and re-embedding.
//!
//! Extraction goes through `kamadak-exif`, which understands JPEG, TIFF,
//! PNG, WebP and HEIF containers and hands back the raw TIFF-structured
//! EXIF block. Embedding writes that block into freshly encoded files:
//! an APP1 segment for JPEG, a VP8X-flagged `EXIF` chunk for WebP.

use crate::error::TranscodeError;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const VP8X_EXIF_FLAG: u8 = 0x08;
const VP8X_ALPHA_FLAG: u8 = 0x10;

/// Read the raw EXIF block of an image file.
///
/// Returns `None` when the file has no EXIF data or cannot be parsed.
pub fn read_exif(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let raw = exif.buf();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_vec())
    }
}

/// Insert an APP1 EXIF segment into an encoded JPEG.
///
/// The segment goes right after SOI, or after the JFIF APP0 segment when
/// the encoder wrote one.
pub fn embed_exif_jpeg(jpeg: &[u8], exif: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return Err(TranscodeError::Metadata("not a JPEG stream".to_string()));
    }

    let segment_len = EXIF_HEADER.len() + exif.len() + 2;
    if segment_len > u16::MAX as usize {
        return Err(TranscodeError::Metadata(format!(
            "EXIF block too large for a JPEG APP1 segment ({} bytes)",
            exif.len()
        )));
    }

    let mut insert_at = 2;
    if jpeg[2] == 0xFF && jpeg[3] == 0xE0 && jpeg.len() >= 6 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        if 4 + app0_len <= jpeg.len() {
            insert_at = 4 + app0_len;
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + segment_len + 2);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&(segment_len as u16).to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(exif);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}

/// Attach an `EXIF` chunk to an encoded WebP file.
///
/// Simple-format files (a lone `VP8 ` or `VP8L` chunk) are promoted to the
/// extended format by prepending a `VP8X` header sized from `width` and
/// `height`.
pub fn embed_exif_webp(
    webp: &[u8],
    exif: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, TranscodeError> {
    if webp.len() < 20 || &webp[0..4] != b"RIFF" || &webp[8..12] != b"WEBP" {
        return Err(TranscodeError::Metadata("not a WebP stream".to_string()));
    }
    if width == 0 || height == 0 || width > 1 << 24 || height > 1 << 24 {
        return Err(TranscodeError::Metadata(format!(
            "invalid WebP canvas {}x{}",
            width, height
        )));
    }

    let chunks = &webp[12..];
    let first = &chunks[0..4];

    let mut body = Vec::with_capacity(webp.len() + exif.len() + 32);
    body.extend_from_slice(b"WEBP");

    if first == b"VP8X" {
        if chunks.len() < 18 {
            return Err(TranscodeError::Metadata("truncated VP8X chunk".to_string()));
        }
        let mut extended = chunks.to_vec();
        // flags byte is the first byte of the VP8X payload
        extended[8] |= VP8X_EXIF_FLAG;
        body.extend_from_slice(&extended);
    } else if first == b"VP8 " || first == b"VP8L" {
        let mut flags = VP8X_EXIF_FLAG;
        if first == b"VP8L" && vp8l_has_alpha(&chunks[8..]) {
            flags |= VP8X_ALPHA_FLAG;
        }
        body.extend_from_slice(b"VP8X");
        body.extend_from_slice(&10u32.to_le_bytes());
        body.push(flags);
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(&(width - 1).to_le_bytes()[..3]);
        body.extend_from_slice(&(height - 1).to_le_bytes()[..3]);
        body.extend_from_slice(chunks);
    } else {
        return Err(TranscodeError::Metadata(format!(
            "unexpected WebP chunk '{}'",
            String::from_utf8_lossy(first)
        )));
    }

    body.extend_from_slice(b"EXIF");
    body.extend_from_slice(&(exif.len() as u32).to_le_bytes());
    body.extend_from_slice(exif);
    if exif.len() % 2 == 1 {
        body.push(0);
    }

    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Alpha hint bit of a VP8L bitstream header
fn vp8l_has_alpha(payload: &[u8]) -> bool {
    if payload.len() < 5 || payload[0] != 0x2F {
        return false;
    }
    let bits = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
    (bits >> 28) & 1 == 1
}
