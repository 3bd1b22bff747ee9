#[cfg(feature = "live")]
use std::sync::mpsc::{RecvError, SendError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Error while clearing the output directory:\n{0}")]
    Clean(#[from] CleanError),

    #[error("Error while loading the configuration:\n{0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),

    #[error("Error while building assets.\n{0}")]
    Build(#[from] BuildError),

    #[cfg(feature = "live")]
    #[error("Error while watching for file changes:\n{0}")]
    Watch(#[from] WatchError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read the configuration file.\n{0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Couldn't parse the configuration file.\n{0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Couldn't remove the old output directory.\n{0}")]
    Remove(#[source] std::io::Error),

    #[error("Couldn't create the output directory.\n{0}")]
    Create(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Task '{0}':\n{1}")]
    Task(String, anyhow::Error),
}

#[cfg(feature = "live")]
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Couldn't bind the live-reload socket.\n{0}")]
    Bind(#[source] std::io::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Clean(#[from] CleanError),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Recv(#[from] RecvError),

    #[error(transparent)]
    Send(#[from] SendError<()>),
}
