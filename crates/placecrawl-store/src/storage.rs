//! Object storage behind crawl artifacts.
//!
//! Keys are laid out the same way in every backend, relative to a root:
//!
//! ```text
//! <root>/partials/<run_id>/worker_<id>/part_<seq>.json
//! <root>/master/<prefix>_<timestamp>.json
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use placecrawl_core::{AppConfig, StorageMode, StoreRecord};
use serde::de::DeserializeOwned;

use crate::error::StoreError;

const PARTIALS: &str = "partials";
const MASTER: &str = "master";

#[derive(Debug, Clone)]
pub struct Storage {
    store: Arc<dyn ObjectStore>,
    root: ObjectPath,
    /// Prefix for human-readable locations in logs and reports.
    base: String,
}

impl Storage {
    /// Wrap any object store. `root` is prepended to every key; `base` is
    /// shown in front of keys in reported locations.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, root: &str, base: &str) -> Self {
        Self {
            store,
            root: ObjectPath::from(root),
            base: base.to_string(),
        }
    }

    /// Files under `output_dir`, which is created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory cannot be created or opened.
    pub fn local(output_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(output_dir).map_err(StoreError::io(output_dir))?;
        let store = LocalFileSystem::new_with_prefix(output_dir)
            .map_err(StoreError::object(output_dir.display()))?;
        Ok(Self::new(
            Arc::new(store),
            "",
            &output_dir.display().to_string(),
        ))
    }

    /// Objects under `s3://<bucket>/<prefix>`. Credentials and any unset
    /// region come from the `AWS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Object`] if the client cannot be configured.
    pub fn s3(
        bucket: &str,
        prefix: &str,
        region: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<Self, StoreError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let store = builder
            .build()
            .map_err(StoreError::object(format!("s3://{bucket}")))?;
        Ok(Self::new(Arc::new(store), prefix, &format!("s3://{bucket}")))
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the configured backend cannot be opened.
    pub fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        match &config.storage {
            StorageMode::Local => Self::local(&config.output_dir),
            StorageMode::S3 {
                bucket,
                prefix,
                region,
                endpoint,
            } => Self::s3(bucket, prefix, region.as_deref(), endpoint.as_deref()),
        }
    }

    /// Key of `rel` below the storage root.
    #[must_use]
    pub fn key(&self, rel: &str) -> ObjectPath {
        self.root
            .parts()
            .chain(ObjectPath::from(rel).parts())
            .collect()
    }

    #[must_use]
    pub fn partials_dir(&self) -> ObjectPath {
        self.key(PARTIALS)
    }

    #[must_use]
    pub fn master_dir(&self) -> ObjectPath {
        self.key(MASTER)
    }

    /// Where `key` lives, as a path or URL a person can look up.
    #[must_use]
    pub fn location_of(&self, key: &ObjectPath) -> String {
        if self.base.is_empty() || self.base.ends_with('/') {
            format!("{}{key}", self.base)
        } else {
            format!("{}/{key}", self.base)
        }
    }

    /// Store `records` as a pretty JSON array. Both backends replace the
    /// object in one step, so readers never see half a file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the upload fails.
    pub async fn write_records(
        &self,
        key: &ObjectPath,
        records: &[StoreRecord],
    ) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(records).map_err(StoreError::json(key))?;
        self.store
            .put(key, PutPayload::from(json))
            .await
            .map_err(StoreError::object(key))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the object is missing or not a record array.
    pub async fn read_records(&self, key: &ObjectPath) -> Result<Vec<StoreRecord>, StoreError> {
        self.read_json(key).await
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(
        &self,
        key: &ObjectPath,
    ) -> Result<T, StoreError> {
        let bytes = self
            .store
            .get(key)
            .await
            .map_err(StoreError::object(key))?
            .bytes()
            .await
            .map_err(StoreError::object(key))?;
        serde_json::from_slice(&bytes).map_err(StoreError::json(key))
    }

    /// Every `*.json` key below `dir`, in sorted order. An empty or missing
    /// prefix has none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Object`] if listing fails.
    pub async fn list_json(&self, dir: &ObjectPath) -> Result<Vec<ObjectPath>, StoreError> {
        let objects: Vec<ObjectMeta> = self
            .store
            .list(Some(dir))
            .try_collect()
            .await
            .map_err(StoreError::object(dir))?;
        let mut keys: Vec<ObjectPath> = objects
            .into_iter()
            .map(|meta| meta.location)
            .filter(|key| key.extension() == Some("json"))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Object`] if the delete fails.
    pub async fn delete(&self, key: &ObjectPath) -> Result<(), StoreError> {
        self.store
            .delete(key)
            .await
            .map_err(StoreError::object(key))
    }
}
