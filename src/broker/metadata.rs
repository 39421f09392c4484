//! On-disk description of which topics and channels exist and whether they
//! are paused.

use std::path::{Path, PathBuf};

use ferrumq_error::{FerrumResult, MetadataError};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{fsutil, version};

/// Name of the metadata file inside the data directory.
pub const METADATA_FILE_NAME: &str = "ferrumqd.dat";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub topics: Vec<TopicMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMetadata {
    pub name: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub channels: Vec<ChannelMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub name: String,
    #[serde(default)]
    pub paused: bool,
}

/// Files written by older daemons store empty lists as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn metadata_file(data_path: &Path) -> PathBuf {
    data_path.join(METADATA_FILE_NAME)
}

impl Metadata {
    /// Metadata stamped with the running binary's version.
    pub fn new(topics: Vec<TopicMetadata>) -> Self {
        Self {
            version: version::BINARY.to_string(),
            topics,
        }
    }

    /// Reads and parses `path`. A missing file is an empty broker.
    pub fn read(path: &Path) -> FerrumResult<Self> {
        let Some(data) = fsutil::read_or_empty(path).map_err(|e| MetadataError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        else {
            return Ok(Self::default());
        };

        serde_json::from_slice(&data).map_err(|e| {
            MetadataError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Serialises and atomically replaces `path`.
    pub fn write(
        &self,
        path: &Path,
    ) -> FerrumResult<()> {
        let data = serde_json::to_vec(self).map_err(|e| MetadataError::Serialize {
            reason: e.to_string(),
        })?;

        fsutil::atomic_write(path, &data).map_err(|e| {
            MetadataError::Write {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}
