//! Compiles the Sass entry point with `grass`.
//!
//! Mirrors the usual dual output: a readable `*.css` next to a compressed
//! `*.min.css`, both in the `styles/` output directory.

use thiserror::Error;

use crate::BuildContext;

#[derive(Debug, Error)]
pub enum StyleError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Couldn't compile the stylesheet.\n{0}")]
    Sass(#[from] Box<grass::Error>),
}

pub fn build(context: &BuildContext) -> Result<(), StyleError> {
    let entry = context.paths.src_styles();
    let stem = entry.file_stem().unwrap_or("style");
    let dist = context.paths.dist_styles();

    let expanded = grass::from_path(
        &entry,
        &grass::Options::default().style(grass::OutputStyle::Expanded),
    )?;
    crate::io::write_file(&dist.join(format!("{stem}.css")), expanded)?;

    let compressed = grass::from_path(
        &entry,
        &grass::Options::default().style(grass::OutputStyle::Compressed),
    )?;
    crate::io::write_file(&dist.join(format!("{stem}.min.css")), compressed)?;

    Ok(())
}
