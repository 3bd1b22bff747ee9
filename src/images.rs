//! Converts source images to WebP and recompresses them, with conversion
//! results cached by content hash so unchanged images are never re-encoded.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};

use camino::{Utf8Path, Utf8PathBuf};
use image::{DynamicImage, ExtendedColorType, ImageReader};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use thiserror::Error;

use crate::{BuildContext, Hash32};

/// Extensions picked up from the image source directory.
const IMG_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

/// Formats the `image` crate re-encodes; everything else passes through.
const RASTER_EXTS: &[&str] = &["png", "jpg", "jpeg"];

const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Couldn't compile glob pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

pub fn build(context: &BuildContext) -> Result<(), ImageError> {
    let base = context.paths.src_images();
    if !base.is_dir() {
        return Ok(());
    }

    let sources = find_sources(&base)?;

    sources
        .par_iter()
        .try_for_each(|path| process(context, &base, path))
}

fn find_sources(base: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ImageError> {
    let mut sources = Vec::new();

    for entry in glob::glob(base.join("**/*").as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;

        let ext = match path.extension() {
            Some(ext) => ext.to_ascii_lowercase(),
            None => continue,
        };

        if path.is_file() && IMG_EXTS.contains(&ext.as_str()) {
            sources.push(path);
        }
    }

    Ok(sources)
}

fn process(context: &BuildContext, base: &Utf8Path, path: &Utf8Path) -> Result<(), ImageError> {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let dist = context.paths.dist_images();
    let ext = path.extension().unwrap_or_default().to_ascii_lowercase();

    if !RASTER_EXTS.contains(&ext.as_str()) {
        // gif, svg and pre-existing webp pass through untouched
        return Ok(crate::io::stage(path, &dist.join(rel))?);
    }

    let cache = context.paths.cache.join("img");
    fs::create_dir_all(&cache)?;

    let hash = Hash32::hash_file(path)?.to_hex();
    let cache_webp = cache.join(format!("{hash}.webp"));
    let cache_same = cache.join(format!("{hash}.{ext}"));

    if !cache_webp.exists() || !cache_same.exists() {
        let reader = BufReader::new(File::open(path)?);
        let img = ImageReader::new(reader).with_guessed_format()?.decode()?;

        if !cache_webp.exists() {
            encode_webp(&img, &cache_webp)?;
        }

        if !cache_same.exists() {
            recompress(&img, &cache_same, &ext)?;
        }
    }

    crate::io::stage(&cache_webp, &dist.join(rel).with_extension("webp"))?;
    crate::io::stage(&cache_same, &dist.join(rel))?;

    Ok(())
}

fn encode_webp(img: &DynamicImage, out: &Utf8Path) -> Result<(), ImageError> {
    use image::codecs::webp::WebPEncoder;

    let rgba = img.to_rgba8();
    let mut writer = BufWriter::new(File::create(out)?);

    WebPEncoder::new_lossless(&mut writer).encode(
        &rgba,
        img.width(),
        img.height(),
        ExtendedColorType::Rgba8,
    )?;

    Ok(())
}

fn recompress(img: &DynamicImage, out: &Utf8Path, ext: &str) -> Result<(), ImageError> {
    use image::ImageEncoder;

    let mut writer = BufWriter::new(File::create(out)?);

    match ext {
        "png" => {
            use image::codecs::png::PngEncoder;

            let rgba = img.to_rgba8();
            PngEncoder::new(&mut writer).write_image(
                &rgba,
                img.width(),
                img.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        _ => {
            use image::codecs::jpeg::JpegEncoder;

            // JPEG has no alpha channel
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).write_image(
                &rgb,
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, Paths};

    fn fixture() -> (tempfile::TempDir, BuildContext) {
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

        (temp, context)
    }

    #[test]
    fn test_raster_image_gains_webp_rendition() {
        let (_temp, context) = fixture();

        let images = context.paths.src_images();
        fs::create_dir_all(&images).unwrap();
        image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]))
            .save(images.join("dot.png"))
            .unwrap();

        build(&context).unwrap();

        let dist = context.paths.dist_images();
        assert!(dist.join("dot.png").is_file());
        assert!(dist.join("dot.webp").is_file());
    }

    #[test]
    fn test_conversion_artifacts_are_cached_by_content() {
        let (_temp, context) = fixture();

        let images = context.paths.src_images();
        fs::create_dir_all(&images).unwrap();
        let source = images.join("dot.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 255, 0, 255]))
            .save(&source)
            .unwrap();

        build(&context).unwrap();

        let hash = Hash32::hash_file(&source).unwrap().to_hex();
        let cached = context.paths.cache.join(format!("img/{hash}.webp"));
        assert!(cached.is_file());

        // rebuilding after a clean reuses the cache
        fs::remove_dir_all(&context.paths.dist).unwrap();
        build(&context).unwrap();
        assert!(context.paths.dist_images().join("dot.webp").is_file());
    }

    #[test]
    fn test_svg_passes_through_unchanged() {
        let (_temp, context) = fixture();

        let images = context.paths.src_images();
        fs::create_dir_all(&images).unwrap();
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
        fs::write(images.join("logo.svg"), svg).unwrap();

        build(&context).unwrap();

        let copied = context.paths.dist_images().join("logo.svg");
        assert_eq!(fs::read_to_string(copied).unwrap(), svg);
    }

    #[test]
    fn test_missing_image_directory_is_not_an_error() {
        let (_temp, context) = fixture();
        build(&context).unwrap();
    }
}
