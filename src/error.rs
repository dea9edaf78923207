use std::path::PathBuf;

/// Errors surfaced by the channel workspace.
///
/// Expected outcomes (duplicate ids, validation findings, a corrupt index on
/// the soft load path) are not errors; they come back as structured values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid channel name '{0}': must match ^[a-z0-9][a-z0-9_-]{{0,62}}$")]
    InvalidChannelName(String),

    #[error("channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("channel '{0}' already exists")]
    ChannelExists(String),

    #[error("channel '{name}' is already bound to {channel_id}")]
    AlreadyBound { name: String, channel_id: String },

    #[error("{} not found", .0.display())]
    QueueNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
