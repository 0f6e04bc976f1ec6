//! Image descriptors ("templates").
//!
//! A template names a stored image object the face comparator can read. On
//! the wire it is the JSON text `{"S3Object":{"Bucket":..,"Name":..}}`,
//! base64-encoded so it can travel as an opaque string.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding a transport-encoded template
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Template payload is not a valid descriptor: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Location of a stored image object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Image descriptor handed to the face comparator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "S3Object")]
    pub object: ObjectRef,
}

impl Template {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            object: ObjectRef {
                bucket: bucket.into(),
                name: name.into(),
            },
        }
    }

    pub fn bucket(&self) -> &str {
        &self.object.bucket
    }

    pub fn name(&self) -> &str {
        &self.object.name
    }

    /// Encode the template for transport
    pub fn encode(&self) -> String {
        // Serializing two string fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// Decode a transport-encoded template
    pub fn decode(encoded: &str) -> Result<Self, TemplateError> {
        let json = STANDARD.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&json)?)
    }
}
