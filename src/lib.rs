#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod config;
mod error;
pub mod fontface;
pub mod fonts;
pub mod html;
#[cfg(feature = "images")]
pub mod images;
mod io;
pub mod scripts;
pub mod sprite;
#[cfg(feature = "styles")]
pub mod styles;
#[cfg(feature = "live")]
mod watch;

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use camino::Utf8PathBuf;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

pub use crate::config::Paths;
pub use crate::error::*;

const GLOB_OPTS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// This value controls whether the pipeline should run in the `Build` or the
/// `Watch` mode. In `Build` mode, every asset is processed just once and the
/// process stops. In `Watch` mode, the pipeline performs the initial build,
/// opens up a websocket port, and watches for changes in the file system,
/// re-running only the tasks whose sources changed. Using the `Watch` mode
/// enables live-reload while editing styles, scripts or markup.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// Run the pipeline in `Build` mode.
    Build,
    /// Run the pipeline in `Watch` mode.
    Watch,
}

/// Runtime data passed to every task: the current mode, the live-reload
/// websocket port (when watching), and the resolved path layout.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Pipeline mode.
    pub mode: Mode,
    /// Live-reload websocket port.
    pub port: Option<u16>,
    /// Source and destination layout.
    pub paths: Paths,
}

impl BuildContext {
    /// Get the JS snippet which enables live reloading in the browser.
    pub fn refresh_script(&self) -> Option<String> {
        self.port.map(|port| {
            format!(
                r#"
const socket = new WebSocket("ws://localhost:{port}");
socket.addEventListener("message", event => {{
    window.location.reload();
}});
"#
            )
        })
    }
}

/// 32 bytes length generic hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct Hash32([u8; 32]);

impl<T> From<T> for Hash32
where
    T: Into<[u8; 32]>,
{
    fn from(value: T) -> Self {
        Hash32(value.into())
    }
}

impl Hash32 {
    pub(crate) fn hash_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        Ok(blake3::Hasher::new()
            .update_mmap_rayon(path)?
            .finalize()
            .into())
    }

    pub(crate) fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = vec![0u8; 64];

        for (i, &byte) in self.0.iter().enumerate() {
            acc[i * 2] = HEX[(byte >> 4) as usize];
            acc[i * 2 + 1] = HEX[(byte & 0xF) as usize];
        }

        String::from_utf8(acc).unwrap()
    }
}

impl Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

/// Task function pointer executed during the build. Provided by the userland
/// wiring, called internally by the pipeline.
type TaskFnPtr = Box<dyn Fn(&BuildContext) -> anyhow::Result<()> + Send + Sync>;

/// A single file-transform step: a name, the globs that should trigger it
/// while watching, and the function doing the work.
pub struct Task {
    name: &'static str,
    watch: Vec<glob::Pattern>,
    func: TaskFnPtr,
}

impl Task {
    pub fn new<F>(
        name: &'static str,
        watch: impl IntoIterator<Item = String>,
        func: F,
    ) -> Result<Self, glob::PatternError>
    where
        F: Fn(&BuildContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(Self {
            name,
            watch: watch
                .into_iter()
                .map(|pattern| glob::Pattern::new(&pattern))
                .collect::<Result<_, _>>()?,
            func: Box::new(func),
        })
    }

    fn is_triggered_by(&self, changed: &HashSet<Utf8PathBuf>) -> bool {
        changed.iter().any(|path| {
            self.watch
                .iter()
                .any(|pattern| pattern.matches_path_with(path.as_std_path(), GLOB_OPTS))
        })
    }

    fn run(&self, context: &BuildContext) -> Result<(), BuildError> {
        (self.func)(context).map_err(|e| BuildError::Task(self.name.to_string(), e))
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({})", self.name)
    }
}

/// This struct represents the whole asset pipeline: a flat list of
/// independent transform tasks plus sequential post-build steps. The
/// individual tasks can be registered by calling the `config` function.
pub struct Pipeline {
    pub(crate) paths: Paths,
    /// Independent transform tasks, run in parallel.
    pub(crate) tasks: Vec<Task>,
    /// Steps which run sequentially after every task has finished.
    pub(crate) post: Vec<Task>,
}

impl Pipeline {
    pub fn config(paths: Paths) -> Config {
        Config::new(paths)
    }

    /// Process every asset once and stop.
    pub fn build(&mut self) -> Result<(), PipelineError> {
        eprintln!(
            "Running {} in {} mode.",
            style("Tsumiki").red(),
            style("build").blue()
        );

        let context = BuildContext {
            mode: Mode::Build,
            port: None,
            paths: self.paths.clone(),
        };

        crate::io::clear_dist(&self.paths.dist)?;
        self.run_tasks(&context)?;

        Ok(())
    }

    /// Build, then keep watching the source tree and re-run affected tasks,
    /// notifying connected browsers over a websocket.
    #[cfg(feature = "live")]
    pub fn watch(&mut self) -> Result<(), PipelineError> {
        eprintln!(
            "Running {} in {} mode.",
            style("Tsumiki").red(),
            style("watch").blue()
        );

        watch::watch(self)?;

        Ok(())
    }

    pub(crate) fn run_tasks(&self, context: &BuildContext) -> Result<(), BuildError> {
        let s = Instant::now();

        let total = self.tasks.len();
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("invalid progress bar template")
                .progress_chars("#>-"),
        );

        let active = Arc::new(Mutex::new(HashSet::new()));

        self.tasks
            .par_iter()
            .try_for_each(|task| -> Result<_, BuildError> {
                let name = Cow::from(task.name);

                {
                    let mut active = active.lock().unwrap();
                    active.insert(name.clone());
                    let msg = format_active(&active);
                    bar.set_message(msg);
                }

                task.run(context)?;

                {
                    let mut active = active.lock().unwrap();
                    active.remove(&name);
                    let msg = format_active(&active);
                    bar.set_message(msg);
                    bar.inc(1);
                }

                Ok(())
            })?;

        bar.finish_with_message(format!("Finished tasks {}", crate::io::as_overhead(s)));

        for step in &self.post {
            step.run(context)?;
        }

        Ok(())
    }

    /// Re-run only the tasks whose watch globs match a changed path. Returns
    /// whether anything ran at all.
    pub(crate) fn run_triggered(
        &self,
        context: &BuildContext,
        changed: &HashSet<Utf8PathBuf>,
    ) -> Result<bool, BuildError> {
        let triggered: Vec<_> = self
            .tasks
            .iter()
            .filter(|task| task.is_triggered_by(changed))
            .collect();

        if triggered.is_empty() {
            return Ok(false);
        }

        triggered
            .par_iter()
            .try_for_each(|task| task.run(context))?;

        for step in &self.post {
            step.run(context)?;
        }

        Ok(true)
    }
}

fn format_active(active: &HashSet<Cow<str>>) -> String {
    const MAX: usize = 5;
    let mut names: Vec<_> = active.iter().cloned().collect();
    names.sort();

    if names.len() <= MAX {
        names.join(", ")
    } else {
        format!("{}… ({} total)", names[..MAX].join(", "), names.len())
    }
}

/// A builder struct for creating a `Pipeline` with specified tasks.
pub struct Config {
    paths: Paths,
    tasks: Vec<Task>,
    post: Vec<Task>,
}

impl Config {
    fn new(paths: Paths) -> Self {
        Self {
            paths,
            tasks: Vec::new(),
            post: Vec::new(),
        }
    }

    /// Register an independent transform task.
    pub fn add_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Register a step which runs after all transform tasks, in registration
    /// order.
    pub fn add_post_step(mut self, task: Task) -> Self {
        self.post.push(task);
        self
    }

    pub fn finish(self) -> Pipeline {
        Pipeline {
            paths: self.paths,
            tasks: self.tasks,
            post: self.post,
        }
    }
}
