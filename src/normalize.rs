// CSV encoding repair — turn a mixed-encoding CSV into plain ASCII.
//
// Hand-collected training data arrives as Latin-1, UTF-8, or UTF-8 that was
// decoded as Latin-1 or Windows-1252 somewhere along the way ("Ã©" instead
// of "é", "â€™" instead of "’"). Every
// field goes through the same three steps: undo that double decoding,
// NFKD-decompose, drop whatever is still non-ASCII (accents, mostly).

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::WINDOWS_1252;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

/// Decode file bytes as UTF-8, falling back to Latin-1 (one byte per char).
pub fn decode_bytes(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// The single byte `c` came from when UTF-8 was mis-decoded as Latin-1 or
/// Windows-1252, if there is one.
fn mojibake_byte(c: char) -> Option<u8> {
    if let Ok(b) = u8::try_from(c) {
        return Some(b);
    }
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
    match bytes.as_ref() {
        [b] if !had_errors => Some(*b),
        _ => None,
    }
}

/// Number of continuation bytes a UTF-8 lead byte announces.
fn continuation_len(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(1),
        0xE0..=0xEF => Some(2),
        0xF0..=0xF4 => Some(3),
        _ => None,
    }
}

/// Undo UTF-8 text that was mis-decoded as Latin-1 or Windows-1252.
///
/// Works run by run: each lead char plus the continuation chars it needs is
/// mapped back to bytes and replaced only if those bytes are one valid UTF-8
/// char. Everything else is kept as-is, so one unrepairable sequence doesn't
/// block the rest of the field.
pub fn repair_mojibake(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        if let Some((c, width)) = decode_run(&chars[i..]) {
            out.push(c);
            i += width;
            changed = true;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

/// Decode the mojibake sequence at the start of `chars`, returning the
/// original char and how many chars it spanned.
fn decode_run(chars: &[char]) -> Option<(char, usize)> {
    let lead = mojibake_byte(*chars.first()?)?;
    let width = continuation_len(lead)? + 1;
    if chars.len() < width {
        return None;
    }

    let mut bytes = Vec::with_capacity(width);
    bytes.push(lead);
    for &c in &chars[1..width] {
        match mojibake_byte(c) {
            Some(b @ 0x80..=0xBF) => bytes.push(b),
            _ => return None,
        }
    }

    let decoded = std::str::from_utf8(&bytes).ok()?;
    decoded.chars().next().map(|c| (c, width))
}

/// Repair, decompose, and strip a string down to ASCII.
pub fn to_ascii(text: &str) -> String {
    repair_mojibake(text)
        .nfkd()
        .filter(char::is_ascii)
        .collect()
}

/// `data/foo.csv` -> `data/foo_ascii.csv`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_ascii.csv"))
}

/// Rewrite every field of `input` through [`to_ascii`] into `output`.
///
/// Returns the number of data rows written (header excluded).
pub fn normalize_csv(input: &Path, output: &Path) -> Result<usize> {
    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let text = decode_bytes(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header from {}", input.display()))?
        .clone();
    writer.write_record(headers.iter().map(to_ascii))?;

    let mut rows = 0usize;
    for record in reader.records() {
        let record = record.with_context(|| {
            format!("Malformed CSV row {} in {}", rows + 2, input.display())
        })?;
        writer.write_record(record.iter().map(to_ascii))?;
        rows += 1;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows,
        "Normalized CSV to ASCII"
    );
    Ok(rows)
}
