//! Assembles and minifies the script entry point.
//!
//! The entry goes through the same `@@include` expansion as the markup and
//! is written out verbatim; a bundled + minified build is produced by the
//! `esbuild` binary, which must be available in the system PATH.

use std::process::{Command, Stdio};

use camino::Utf8Path;
use thiserror::Error;

use crate::BuildContext;
use crate::html::{self, HtmlError};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Include(#[from] HtmlError),

    #[error("Esbuild execution failed: {0}")]
    Esbuild(String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn build(context: &BuildContext) -> Result<(), ScriptError> {
    let entry = context.paths.src_scripts();
    let dist = context.paths.dist_scripts();

    let assembled = html::expand(&entry)?;
    let name = entry.file_name().unwrap_or("index.js");
    crate::io::write_file(&dist.join(name), assembled)?;

    let minified = compile_esbuild(&entry)?;
    crate::io::write_file(&dist.join(min_name(&entry)), minified)?;

    Ok(())
}

fn min_name(entry: &Utf8Path) -> String {
    format!("{}.min.js", entry.file_stem().unwrap_or("index"))
}

fn compile_esbuild(file: &Utf8Path) -> Result<Vec<u8>, ScriptError> {
    let output = Command::new("esbuild")
        .arg(file.as_str())
        .arg("--format=iife")
        .arg("--bundle")
        .arg("--minify")
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()?;

    if !output.status.success() {
        return Err(ScriptError::Esbuild(String::from_utf8(output.stdout)?));
    }

    Ok(output.stdout)
}
