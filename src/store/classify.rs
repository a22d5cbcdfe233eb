//! Content-type sniffing for uploads.

use super::ALLOWED_IMAGE_TYPES;

/// Number of leading bytes inspected when classifying content.
pub const SNIFF_LEN: usize = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Magic-byte signatures checked in order.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"\xef\xbb\xbf", TEXT_PLAIN),
];

/// Guess the MIME type of `content` from its first [`SNIFF_LEN`] bytes.
///
/// Falls back to `text/plain` for prefixes without control bytes and to
/// `application/octet-stream` otherwise.
pub fn classify(content: &[u8]) -> &'static str {
    let prefix = &content[..content.len().min(SNIFF_LEN)];

    if prefix.len() >= 16 && &prefix[..4] == b"RIFF" && &prefix[8..14] == b"WEBPVP" {
        return "image/webp";
    }

    if let Some(mime) = SIGNATURES
        .iter()
        .find(|(sig, _)| prefix.starts_with(sig))
        .map(|(_, mime)| *mime)
    {
        return mime;
    }

    let trimmed = trim_leading_whitespace(prefix);
    if starts_with_ignore_case(trimmed, b"<!doctype html")
        || starts_with_ignore_case(trimmed, b"<html")
    {
        return "text/html; charset=utf-8";
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if prefix.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

/// Check whether a MIME type is on the upload allow-list.
pub fn is_allowed_image_type(mime_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.iter().any(|allowed| *allowed == mime_type)
}

/// Default file extension (with leading dot) for a MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".bin",
    }
}

fn trim_leading_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn starts_with_ignore_case(bytes: &[u8], pattern: &[u8]) -> bool {
    bytes.len() >= pattern.len() && bytes[..pattern.len()].eq_ignore_ascii_case(pattern)
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}
