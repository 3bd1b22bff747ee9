//! Converts TrueType fonts into the web container formats.
//!
//! Conversion is delegated to the reference tools, `sfnt2woff` and
//! `woff2_compress`, which must be available in the system PATH. Converted
//! files are cached by content hash, so a font is only ever converted once.

use std::fs;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use thiserror::Error;

use crate::{BuildContext, Hash32};

/// Conversion tool and the extension of the file it produces. Both tools
/// write their output next to the input file.
const CONVERTERS: &[(&str, &str)] = &[("sfnt2woff", "woff"), ("woff2_compress", "woff2")];

#[derive(Debug, Error)]
pub enum FontError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Font conversion tool '{tool}' failed on '{file}'")]
    Tool {
        tool: &'static str,
        file: Utf8PathBuf,
    },

    #[error("Font conversion tool '{tool}' produced no output for '{file}'")]
    MissingOutput {
        tool: &'static str,
        file: Utf8PathBuf,
    },
}

pub fn build(context: &BuildContext) -> Result<(), FontError> {
    let base = context.paths.src_fonts();
    if !base.is_dir() {
        return Ok(());
    }

    let sources = find_sources(&base)?;

    sources
        .par_iter()
        .try_for_each(|path| process(context, &base, path))
}

fn find_sources(base: &Utf8Path) -> Result<Vec<Utf8PathBuf>, FontError> {
    let mut sources = Vec::new();

    for entry in glob::glob(base.join("**/*.ttf").as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;

        if path.is_file() {
            sources.push(path);
        }
    }

    Ok(sources)
}

fn process(context: &BuildContext, base: &Utf8Path, path: &Utf8Path) -> Result<(), FontError> {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let cache = context.paths.cache.join("fonts");
    fs::create_dir_all(&cache)?;

    let hash = Hash32::hash_file(path)?.to_hex();

    for &(tool, ext) in CONVERTERS {
        let cached = cache.join(format!("{hash}.{ext}"));

        if !cached.exists() {
            convert(tool, path, &cache, &hash, ext)?;
        }

        let dist = context.paths.dist_fonts().join(rel).with_extension(ext);
        crate::io::stage(&cached, &dist)?;
    }

    Ok(())
}

fn convert(
    tool: &'static str,
    src: &Utf8Path,
    cache: &Utf8Path,
    hash: &str,
    ext: &'static str,
) -> Result<(), FontError> {
    // run the tool against a content-addressed copy so its sibling output
    // lands in the cache under the right name
    let staged = cache.join(format!("{hash}.ttf"));
    if !staged.exists() {
        fs::copy(src, &staged)?;
    }

    let status = Command::new(tool)
        .arg(staged.as_str())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        return Err(FontError::Tool {
            tool,
            file: src.into(),
        });
    }

    if !staged.with_extension(ext).exists() {
        return Err(FontError::MissingOutput {
            tool,
            file: src.into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, Paths};

    #[test]
    fn test_find_sources_picks_only_ttf() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("Roboto.ttf"), b"").unwrap();
        fs::write(root.join("nested/OpenSans.ttf"), b"").unwrap();
        fs::write(root.join("readme.txt"), b"").unwrap();

        let mut sources = find_sources(&root).unwrap();
        sources.sort();

        let mut expected = vec![root.join("Roboto.ttf"), root.join("nested/OpenSans.ttf")];
        expected.sort();

        assert_eq!(sources, expected);
    }

    #[test]
    fn test_missing_font_directory_is_not_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let paths = Paths {
            source: root.join("src"),
            dist: root.join("dist"),
            cache: root.join(".cache"),
            ..Paths::default()
        };

        let context = BuildContext {
            mode: Mode::Build,
            port: None,
            paths,
        };

        build(&context).unwrap();
    }
}
