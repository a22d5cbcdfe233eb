//! Filename sanitizing.

/// Name used when sanitizing leaves nothing behind.
pub const FALLBACK_NAME: &str = "image";

const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Strip path separators and other unsafe characters from a user filename.
///
/// The result is only used as the display name; storage paths are always
/// built from the generated id.
pub fn sanitize(name: &str) -> String {
    let safe: String = name.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect();

    if safe.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        safe
    }
}
