//! Assembles HTML from templates via `@@include(...)` directives.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::BuildContext;

const PREFIX: &str = "@@include(";

/// Includes may nest, a cycle would otherwise recurse forever.
const MAX_DEPTH: usize = 16;

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("Couldn't read '{file}'.\n{source}")]
    Read {
        file: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed @@include directive in '{file}'")]
    Malformed { file: Utf8PathBuf },

    #[error("Includes nested deeper than {MAX_DEPTH} levels at '{file}'")]
    TooDeep { file: Utf8PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read a file and recursively splice in every `@@include('partial.html')`
/// directive. Include targets resolve relative to the including file.
pub fn expand(path: &Utf8Path) -> Result<String, HtmlError> {
    expand_at(path, 0)
}

fn expand_at(path: &Utf8Path, depth: usize) -> Result<String, HtmlError> {
    if depth > MAX_DEPTH {
        return Err(HtmlError::TooDeep { file: path.into() });
    }

    let text = fs::read_to_string(path).map_err(|source| HtmlError::Read {
        file: path.into(),
        source,
    })?;

    let base = path.parent().unwrap_or(Utf8Path::new(""));
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();

    while let Some(at) = rest.find(PREFIX) {
        out.push_str(&rest[..at]);

        let after = &rest[at + PREFIX.len()..];
        let (target, consumed) =
            parse_argument(after).ok_or_else(|| HtmlError::Malformed { file: path.into() })?;

        out.push_str(&expand_at(&base.join(target), depth + 1)?);
        rest = &after[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse the quoted argument and closing paren of an include directive.
/// Returns the include target and the number of consumed bytes.
fn parse_argument(input: &str) -> Option<(&str, usize)> {
    let quote = input.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }

    let close = input[1..].find(quote)? + 1;
    let target = &input[1..close];

    let tail = &input[close + 1..];
    let paren = tail.len() - tail.trim_start().len();
    if !tail[paren..].starts_with(')') {
        return None;
    }

    Some((target, close + 1 + paren + 1))
}

/// Build the HTML entry point into the output root. In watch mode the
/// live-reload snippet is spliced in just before `</body>`.
pub fn build(context: &BuildContext) -> Result<(), HtmlError> {
    let entry = context.paths.src_html();
    let mut text = expand(&entry)?;

    if let Some(script) = context.refresh_script() {
        let tag = format!("<script>{script}</script>\n</body>");
        match text.contains("</body>") {
            true => text = text.replacen("</body>", &tag, 1),
            false => text.push_str(&format!("<script>{script}</script>\n")),
        }
    }

    let name = entry.file_name().unwrap_or("index.html");
    crate::io::write_file(&context.paths.dist.join(name), text)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, Paths};

    fn fixture() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        (temp, root)
    }

    #[test]
    fn test_parse_argument() {
        assert_eq!(parse_argument("'a.html')"), Some(("a.html", 9)));
        assert_eq!(parse_argument("\"a.html\" )"), Some(("a.html", 10)));
        assert_eq!(parse_argument("a.html)"), None);
        assert_eq!(parse_argument("'a.html'"), None);
    }

    #[test]
    fn test_expand_nested_includes() {
        let (_temp, root) = fixture();

        fs::write(root.join("index.html"), "<body>@@include('header.html')</body>").unwrap();
        fs::write(root.join("header.html"), "<h1>@@include('title.html')</h1>").unwrap();
        fs::write(root.join("title.html"), "hi").unwrap();

        let text = expand(&root.join("index.html")).unwrap();
        assert_eq!(text, "<body><h1>hi</h1></body>");
    }

    #[test]
    fn test_expand_resolves_relative_to_including_file() {
        let (_temp, root) = fixture();

        fs::create_dir(root.join("templates")).unwrap();
        fs::write(root.join("index.html"), "@@include('templates/nav.html')").unwrap();
        fs::write(root.join("templates/nav.html"), "@@include('item.html')").unwrap();
        fs::write(root.join("templates/item.html"), "<li>x</li>").unwrap();

        let text = expand(&root.join("index.html")).unwrap();
        assert_eq!(text, "<li>x</li>");
    }

    #[test]
    fn test_expand_missing_target_errors() {
        let (_temp, root) = fixture();

        fs::write(root.join("index.html"), "@@include('nope.html')").unwrap();

        assert!(matches!(
            expand(&root.join("index.html")),
            Err(HtmlError::Read { .. })
        ));
    }

    #[test]
    fn test_expand_cycle_is_bounded() {
        let (_temp, root) = fixture();

        fs::write(root.join("a.html"), "@@include('a.html')").unwrap();

        assert!(matches!(
            expand(&root.join("a.html")),
            Err(HtmlError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_build_injects_refresh_script_in_watch_mode() {
        let (_temp, root) = fixture();

        let paths = Paths {
            source: root.join("src"),
            dist: root.join("dist"),
            ..Paths::default()
        };

        fs::create_dir_all(&paths.source).unwrap();
        fs::write(paths.src_html(), "<html><body>hi</body></html>").unwrap();

        let context = BuildContext {
            mode: Mode::Watch,
            port: Some(1337),
            paths: paths.clone(),
        };
        build(&context).unwrap();

        let written = fs::read_to_string(paths.dist.join("index.html")).unwrap();
        assert!(written.contains("ws://localhost:1337"));
        assert!(written.ends_with("</body></html>"));
    }
}
