//! Registers converted fonts in a stylesheet partial.
//!
//! After the font conversion task has populated the output directory, this
//! step appends one `@include font(...)` directive per font family to a
//! designated partial, so converted fonts are usable without manual edits.
//! A non-empty partial is treated as already configured and left untouched,
//! even if new font files have appeared since it was generated.

use std::fs::{self, OpenOptions};
use std::io::Write;

use camino::Utf8Path;
use tracing::warn;

/// The filename segment preceding the first `.`, used as the font family
/// identifier. Conversion outputs share a base name and differ only by
/// extension.
pub fn family_base(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// A single style-include directive binding a family name to itself, with
/// fixed weight `400` and style `normal`.
pub fn directive(family: &str) -> String {
    format!("@include font('{family}', '{family}', '400', 'normal');\n")
}

/// Decide which directives to append, given the current partial contents and
/// the font directory listing. Pure; performs no I/O.
///
/// Non-empty `existing` content suppresses generation entirely. Otherwise one
/// directive is emitted per listing entry whose base name differs from the
/// immediately preceding entry's base name. The deduplication is
/// adjacency-based on purpose: a listing grouped by family yields one
/// directive per family, while an interleaved listing repeats families. This
/// matches the observed output of the tool being replaced.
pub fn directives<'a>(existing: &str, listing: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    if !existing.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut previous: Option<&str> = None;

    for name in listing {
        let base = family_base(name);

        if previous != Some(base) {
            lines.push(directive(base));
        }

        previous = Some(base);
    }

    lines
}

/// Append directives for the fonts found in `fonts_dir` to the `partial`
/// stylesheet. All decided lines are written with a single buffered append.
///
/// A missing partial counts as empty. An unreadable font directory is logged
/// as a warning and the step emits nothing; it never fails the build.
pub fn register(partial: &Utf8Path, fonts_dir: &Utf8Path) -> std::io::Result<()> {
    let existing = match fs::read_to_string(partial) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let entries = match fs::read_dir(fonts_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Couldn't list the font directory {fonts_dir}: {e}");
            return Ok(());
        }
    };

    // Filesystem listing order, deliberately unsorted.
    let listing: Vec<String> = entries
        .filter_map(|entry| Some(entry.ok()?.file_name().to_str()?.to_string()))
        .collect();

    let lines = directives(&existing, listing.iter().map(String::as_str));
    if lines.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new().append(true).create(true).open(partial)?;
    file.write_all(lines.concat().as_bytes())?;

    Ok(())
}
