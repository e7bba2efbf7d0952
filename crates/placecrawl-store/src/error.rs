use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object store error on {key}: {source}")]
    Object {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("JSON error in {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }

    pub(crate) fn object(key: impl ToString) -> impl FnOnce(object_store::Error) -> Self {
        let key = key.to_string();
        move |source| StoreError::Object { key, source }
    }

    pub(crate) fn json(key: impl ToString) -> impl FnOnce(serde_json::Error) -> Self {
        let key = key.to_string();
        move |source| StoreError::Json { key, source }
    }
}
