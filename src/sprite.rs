//! Combines icon SVG files into a single stack-mode sprite.
//!
//! Every icon becomes a nested `<svg id="name">` fragment inside one sprite
//! file; a fragment is shown by referencing the sprite with `#name`, all
//! non-targeted fragments stay hidden via an embedded style rule.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::BuildContext;

const STACK_STYLE: &str = "svg > svg { display: none } svg > svg:target { display: inline }";

/// Sprite location inside the image output directory.
const SPRITE_PATH: &str = "icons/icons.svg";

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Couldn't parse '{0}' as an SVG document")]
    Malformed(Utf8PathBuf),
}

pub fn build(context: &BuildContext) -> Result<(), SpriteError> {
    let base = context.paths.src_icons();
    if !base.is_dir() {
        return Ok(());
    }

    let mut sources = Vec::new();
    for entry in glob::glob(base.join("*.svg").as_str())? {
        sources.push(Utf8PathBuf::try_from(entry?)?);
    }

    // fragment order is part of the output, keep it stable
    sources.sort();

    if sources.is_empty() {
        return Ok(());
    }

    let mut fragments = Vec::new();
    for path in &sources {
        let text = fs::read_to_string(path)?;
        let id = path.file_stem().unwrap_or("icon");

        let (view_box, inner) =
            parse_fragment(&text).ok_or_else(|| SpriteError::Malformed(path.clone()))?;
        fragments.push(render_fragment(id, view_box, inner));
    }

    let sprite = render_sprite(&fragments);
    crate::io::write_file(&context.paths.dist_images().join(SPRITE_PATH), sprite)?;

    Ok(())
}

/// Pull the `viewBox` attribute and the inner markup out of an SVG document.
fn parse_fragment(text: &str) -> Option<(Option<&str>, &str)> {
    let open = text.find("<svg")?;
    let after = &text[open..];

    let close = after.find('>')?;
    let attrs = &after[4..close];

    let body = &after[close + 1..];
    let end = body.rfind("</svg>")?;

    Some((find_attr(attrs, "viewBox"), body[..end].trim()))
}

fn find_attr<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let at = attrs.find(name)?;
    let rest = attrs[at + name.len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();

    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }

    let end = rest[1..].find(quote)?;
    Some(&rest[1..end + 1])
}

fn render_fragment(id: &str, view_box: Option<&str>, inner: &str) -> String {
    match view_box {
        Some(vb) => format!("<svg id=\"{id}\" viewBox=\"{vb}\">{inner}</svg>"),
        None => format!("<svg id=\"{id}\">{inner}</svg>"),
    }
}

fn render_sprite(fragments: &[String]) -> String {
    let mut out = String::from("<svg xmlns=\"http://www.w3.org/2000/svg\">\n");
    out.push_str(&format!("<style>{STACK_STYLE}</style>\n"));

    for fragment in fragments {
        out.push_str(fragment);
        out.push('\n');
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, Paths};

    #[test]
    fn test_parse_fragment() {
        let svg = "<?xml version=\"1.0\"?>\n<svg xmlns=\"x\" viewBox=\"0 0 24 24\">\n  <path d=\"M0 0\"/>\n</svg>\n";
        let (view_box, inner) = parse_fragment(svg).unwrap();

        assert_eq!(view_box, Some("0 0 24 24"));
        assert_eq!(inner, "<path d=\"M0 0\"/>");
    }

    #[test]
    fn test_parse_fragment_without_viewbox() {
        let (view_box, inner) = parse_fragment("<svg><g/></svg>").unwrap();
        assert_eq!(view_box, None);
        assert_eq!(inner, "<g/>");
    }

    #[test]
    fn test_find_attr_quoting() {
        assert_eq!(find_attr(" viewBox='0 0 8 8' ", "viewBox"), Some("0 0 8 8"));
        assert_eq!(find_attr(" viewBox = \"0 0 8 8\"", "viewBox"), Some("0 0 8 8"));
        assert_eq!(find_attr(" width=\"8\"", "viewBox"), None);
    }

    #[test]
    fn test_build_stacks_icons_in_name_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let paths = Paths {
            source: root.join("src"),
            dist: root.join("dist"),
            ..Paths::default()
        };

        let icons = paths.src_icons();
        fs::create_dir_all(&icons).unwrap();
        fs::write(icons.join("b.svg"), "<svg viewBox=\"0 0 1 1\"><g/></svg>").unwrap();
        fs::write(icons.join("a.svg"), "<svg viewBox=\"0 0 2 2\"><path/></svg>").unwrap();

        let context = BuildContext {
            mode: Mode::Build,
            port: None,
            paths: paths.clone(),
        };
        build(&context).unwrap();

        let sprite = fs::read_to_string(paths.dist_images().join("icons/icons.svg")).unwrap();
        let a = sprite.find("<svg id=\"a\" viewBox=\"0 0 2 2\"><path/></svg>").unwrap();
        let b = sprite.find("<svg id=\"b\" viewBox=\"0 0 1 1\"><g/></svg>").unwrap();

        assert!(a < b);
        assert!(sprite.contains(":target"));
    }

    #[test]
    fn test_build_without_icons_emits_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let paths = Paths {
            source: root.join("src"),
            dist: root.join("dist"),
            ..Paths::default()
        };

        let context = BuildContext {
            mode: Mode::Build,
            port: None,
            paths: paths.clone(),
        };
        build(&context).unwrap();

        assert!(!paths.dist_images().join("icons/icons.svg").exists());
    }
}
