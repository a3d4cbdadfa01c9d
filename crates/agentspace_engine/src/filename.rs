use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};

const MAX_STEM_BYTES: usize = 80;

/// Extracts the announced file name from a `Content-Disposition` value.
///
/// The RFC 5987 `filename*=charset'lang'value` form wins over plain `filename=`.
pub fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"');

        if key.eq_ignore_ascii_case("filename*") {
            let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
            if let Ok(decoded) = percent_decode_str(encoded).decode_utf8() {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        } else if key.eq_ignore_ascii_case("filename") && !value.is_empty() {
            plain = Some(value.to_string());
        }
    }
    plain
}

/// Windows-safe, deterministic download name: `{sanitized_stem}--{short_hash(file_id)}{.ext}`.
///
/// Falls back to the file id when the server announced no usable name.
pub fn download_filename(announced: Option<&str>, file_id: &str) -> String {
    let name = announced
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(file_id);
    let (stem, extension) = split_extension(name);
    let stem = sanitize_stem(stem);
    let hash = short_hash(file_id);
    match extension {
        Some(ext) => format!("{stem}--{hash}.{ext}"),
        None => format!("{stem}--{hash}"),
    }
}

fn split_extension(name: &str) -> (&str, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.trim_matches('.').is_empty()
                && !ext.is_empty()
                && ext.len() <= 10
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (name, None),
    }
}

fn sanitize_stem(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    if compacted.len() > MAX_STEM_BYTES {
        let mut cut = MAX_STEM_BYTES;
        while !compacted.is_char_boundary(cut) {
            cut -= 1;
        }
        compacted.truncate(cut);
    }
    if compacted.is_empty() {
        compacted = "download".to_string();
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
