// Record serialization - the byte format each record file is stored in

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The serializer used for record files. Every file in a store uses the same one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Format::Json => Ok(serde_json::to_vec_pretty(value)?),
            Format::Yaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Format::Json => Ok(serde_json::from_slice(bytes)?),
            Format::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        }
    }
}
