use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::ConfigError;

/// Source globs and destination directories for every pipeline task. All
/// entry points and globs are relative to `source`; the output tree mirrors
/// the conventional layout (`styles/`, `scripts/`, `assets/images/`,
/// `assets/fonts/`) under `dist`.
///
/// The struct deserializes from an optional `tsumiki.toml` at the project
/// root; a missing file means defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    /// Root of the source tree.
    pub source: Utf8PathBuf,
    /// Root of the generated output tree.
    pub dist: Utf8PathBuf,
    /// Directory for content-addressed conversion artifacts.
    pub cache: Utf8PathBuf,
    /// HTML entry point, relative to `source`.
    pub html_entry: Utf8PathBuf,
    /// Glob for HTML template partials, relative to `source`.
    pub templates_glob: String,
    /// Sass entry point, relative to `source`.
    pub styles_entry: Utf8PathBuf,
    /// Glob for stylesheet sources, relative to `source`.
    pub styles_glob: String,
    /// Stylesheet partial receiving generated font-include directives,
    /// relative to `source`.
    pub fonts_partial: Utf8PathBuf,
    /// Script entry point, relative to `source`.
    pub scripts_entry: Utf8PathBuf,
    /// Glob for script sources, relative to `source`.
    pub scripts_glob: String,
    /// Directory with source images, relative to `source`.
    pub images_dir: Utf8PathBuf,
    /// Directory with source font files, relative to `source`.
    pub fonts_dir: Utf8PathBuf,
    /// Directory with sprite icon sources, relative to `source`.
    pub icons_dir: Utf8PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            source: "src".into(),
            dist: "dist".into(),
            cache: ".cache".into(),
            html_entry: "index.html".into(),
            templates_glob: "templates/**/*.html".to_string(),
            styles_entry: "styles/style.scss".into(),
            styles_glob: "styles/**/*.scss".to_string(),
            fonts_partial: "styles/_fonts.scss".into(),
            scripts_entry: "scripts/index.js".into(),
            scripts_glob: "scripts/**/*.js".to_string(),
            images_dir: "assets/images".into(),
            fonts_dir: "assets/fonts".into(),
            icons_dir: "assets/iconsSprite".into(),
        }
    }
}

impl Paths {
    /// Read the configuration from a TOML file. A missing file yields the
    /// default layout.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path.as_ref()) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        Ok(toml::from_str(&text)?)
    }

    pub fn src_html(&self) -> Utf8PathBuf {
        self.source.join(&self.html_entry)
    }

    pub fn src_styles(&self) -> Utf8PathBuf {
        self.source.join(&self.styles_entry)
    }

    pub fn src_fonts_partial(&self) -> Utf8PathBuf {
        self.source.join(&self.fonts_partial)
    }

    pub fn src_scripts(&self) -> Utf8PathBuf {
        self.source.join(&self.scripts_entry)
    }

    pub fn src_images(&self) -> Utf8PathBuf {
        self.source.join(&self.images_dir)
    }

    pub fn src_fonts(&self) -> Utf8PathBuf {
        self.source.join(&self.fonts_dir)
    }

    pub fn src_icons(&self) -> Utf8PathBuf {
        self.source.join(&self.icons_dir)
    }

    pub fn dist_styles(&self) -> Utf8PathBuf {
        self.dist.join("styles")
    }

    pub fn dist_scripts(&self) -> Utf8PathBuf {
        self.dist.join("scripts")
    }

    pub fn dist_images(&self) -> Utf8PathBuf {
        self.dist.join("assets/images")
    }

    pub fn dist_fonts(&self) -> Utf8PathBuf {
        self.dist.join("assets/fonts")
    }
}
