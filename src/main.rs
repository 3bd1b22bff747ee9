use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use tsumiki::{Paths, Pipeline, PipelineError, Task, fontface, fonts, html, scripts, sprite};

#[derive(Parser)]
#[command(name = "tsumiki", version, about)]
struct Cli {
    /// Path to the pipeline configuration file.
    #[arg(long, global = true, default_value = "tsumiki.toml")]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every asset once and exit.
    Build,
    /// Build, then watch the source tree and live-reload the browser.
    #[cfg(feature = "live")]
    Watch,
}

fn main() -> Result<(), PipelineError> {
    #[cfg(feature = "logging")]
    init_logging();

    let cli = Cli::parse();
    let paths = Paths::load(&cli.config)?;
    let mut pipeline = standard(paths)?;

    match cli.command {
        Command::Build => pipeline.build()?,
        #[cfg(feature = "live")]
        Command::Watch => pipeline.watch()?,
    }

    Ok(())
}

/// The standard task graph: markup, styles, scripts, images, fonts and the
/// icon sprite run in parallel into a clean output tree, then the font
/// partial is populated from the converted fonts. Fonts and icons are not
/// re-run while watching, matching how rarely they change.
fn standard(paths: Paths) -> Result<Pipeline, PipelineError> {
    let watch_html = vec![
        paths.src_html().to_string(),
        paths.source.join(&paths.templates_glob).to_string(),
    ];
    let watch_scripts = vec![paths.source.join(&paths.scripts_glob).to_string()];
    #[cfg(feature = "images")]
    let watch_images = vec![paths.src_images().join("**/*").to_string()];

    #[cfg(feature = "styles")]
    let watch_styles = vec![paths.source.join(&paths.styles_glob).to_string()];

    let mut config = Pipeline::config(paths)
        .add_task(Task::new("html", watch_html, |ctx| Ok(html::build(ctx)?))?)
        .add_task(Task::new("scripts", watch_scripts, |ctx| {
            Ok(scripts::build(ctx)?)
        })?)
        .add_task(Task::new("fonts", [], |ctx| Ok(fonts::build(ctx)?))?)
        .add_task(Task::new("sprite", [], |ctx| Ok(sprite::build(ctx)?))?)
        .add_post_step(Task::new("fontface", [], |ctx| {
            Ok(fontface::register(
                &ctx.paths.src_fonts_partial(),
                &ctx.paths.dist_fonts(),
            )?)
        })?);

    #[cfg(feature = "styles")]
    {
        config = config.add_task(Task::new("styles", watch_styles, |ctx| {
            Ok(tsumiki::styles::build(ctx)?)
        })?);
    }

    #[cfg(feature = "images")]
    {
        config = config.add_task(Task::new("images", watch_images, |ctx| {
            Ok(tsumiki::images::build(ctx)?)
        })?);
    }

    Ok(config.finish())
}

#[cfg(feature = "logging")]
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}
