use std::fmt::Display;
use std::fs;
use std::time::Instant;

use camino::Utf8Path;
use console::Style;

use crate::error::CleanError;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Delete the entire output directory if it exists, then recreate it.
pub fn clear_dist(dist: &Utf8Path) -> Result<(), CleanError> {
    let s = Instant::now();

    if fs::metadata(dist).is_ok() {
        fs::remove_dir_all(dist) //
            .map_err(CleanError::Remove)?;
    }

    fs::create_dir_all(dist) //
        .map_err(CleanError::Create)?;

    eprintln!("Cleaned the output directory {}", as_overhead(s));

    Ok(())
}

/// Write a file, creating every missing parent directory.
pub fn write_file(path: &Utf8Path, data: impl AsRef<[u8]>) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    fs::write(path, data)
}

/// Materialize a cached artifact inside the output tree. Hard link when the
/// filesystem allows it, fall back to a copy.
pub fn stage(cache: &Utf8Path, dist: &Utf8Path) -> std::io::Result<()> {
    if let Some(dir) = dist.parent() {
        fs::create_dir_all(dir)?;
    }

    if dist.exists() {
        fs::remove_file(dist)?;
    }

    if fs::hard_link(cache, dist).is_err() {
        fs::copy(cache, dist)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_write_file_creates_parents() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let target = root.join("a/b/c.txt");
        write_file(&target, "hello").unwrap();

        assert_eq!(fs::read_to_string(target).unwrap(), "hello");
    }

    #[test]
    fn test_stage_replaces_existing() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let cache = root.join("cache.bin");
        let dist = root.join("out/artifact.bin");
        fs::write(&cache, b"new").unwrap();
        write_file(&dist, b"old").unwrap();

        stage(&cache, &dist).unwrap();
        assert_eq!(fs::read(dist).unwrap(), b"new");
    }

    #[test]
    fn test_clear_dist_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let dist = root.join("dist");
        write_file(&dist.join("stale.txt"), "x").unwrap();

        clear_dist(&dist).unwrap();
        assert!(dist.exists());
        assert_eq!(fs::read_dir(&dist).unwrap().count(), 0);
    }
}
