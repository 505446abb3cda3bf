use std::path::PathBuf;

use thiserror::Error;

use crate::models::MediaId;

/// Failures while building a [`Catalog`](crate::models::Catalog).
///
/// Media that merely fails to decode is not an error at this level; it is
/// reported to the gallery as broken once a cell tries to show it.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog manifest")]
    Manifest(#[from] serde_json::Error),

    #[error("duplicate media id {0}")]
    DuplicateId(MediaId),

    #[error("media {0} declares an empty category list")]
    EmptyCategorySet(MediaId),

    #[error("catalog root {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("catalog scan task failed")]
    ScanTask(#[from] tokio::task::JoinError),
}
