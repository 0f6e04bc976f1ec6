use crate::comparator::FaceComparator;
use crate::error::{
    ServiceError, IMAGE_DATA_INVALID, SINGLE_TEMPLATE_INVALID, TEMPLATE_LIST_INVALID,
    TEMPLATE_LIST_MISSING,
};
use crate::info::AlgorithmInfo;
use crate::object_store::{generate_object_key, ObjectStore};
use crate::sequencer::{compare_in_order, CandidateScore};
use crate::template::Template;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// Request fields are kept as raw JSON values so a wrongly typed field is
// reported against that field instead of failing the whole body.

/// Body of a create_template request
#[derive(Debug, Default, Deserialize)]
pub struct CreateTemplateRequest {
    /// Base64-encoded image bytes
    #[serde(rename = "ImageData")]
    pub image_data: Option<Value>,
    /// Caller's bucket; accepted but templates always go to the configured bucket
    #[serde(rename = "bucketname")]
    pub bucket_name: Option<Value>,
}

/// Body of a compare_list request
#[derive(Debug, Default, Deserialize)]
pub struct CompareListRequest {
    /// Encoded reference template
    #[serde(rename = "SingleTemplate")]
    pub single_template: Option<Value>,
    /// Ordered list of encoded candidate templates
    #[serde(rename = "TemplateList")]
    pub template_list: Option<Value>,
}

/// A stored template and the object key it was listed under
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Template")]
    pub template: String,
}

/// Template operations over injected store and comparator clients
#[derive(Clone)]
pub struct TemplateService {
    store: Arc<dyn ObjectStore>,
    comparator: Arc<dyn FaceComparator>,
    bucket: String,
}

impl TemplateService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        comparator: Arc<dyn FaceComparator>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            comparator,
            bucket: bucket.into(),
        }
    }

    /// Bucket templates are written to and listed from
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store an image and return its encoded template
    #[instrument(skip(self, request))]
    pub async fn create_template(
        &self,
        request: &CreateTemplateRequest,
    ) -> Result<String, ServiceError> {
        let image = request
            .image_data
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|data| STANDARD.decode(data.trim()).ok())
            .filter(|bytes| !bytes.is_empty())
            .ok_or(ServiceError::InvalidInput(IMAGE_DATA_INVALID))?;

        if let Some(requested) = request.bucket_name.as_ref().and_then(Value::as_str) {
            if requested != self.bucket {
                debug!(
                    requested_bucket = %requested,
                    bucket = %self.bucket,
                    "Ignoring caller-supplied bucket"
                );
            }
        }

        let key = generate_object_key(Utc::now());
        let size_bytes = image.len();

        self.store.put_object(&self.bucket, &key, image).await?;

        info!(bucket = %self.bucket, key = %key, size_bytes, "Template stored");

        Ok(Template::new(&self.bucket, key).encode())
    }

    /// Score every candidate in `TemplateList` against `SingleTemplate`
    #[instrument(skip(self, request))]
    pub async fn compare_list(
        &self,
        request: &CompareListRequest,
    ) -> Result<Vec<CandidateScore>, ServiceError> {
        // A non-array TemplateList counts as missing.
        let encoded_candidates = request
            .template_list
            .as_ref()
            .and_then(Value::as_array)
            .filter(|list| !list.is_empty())
            .ok_or(ServiceError::InvalidInput(TEMPLATE_LIST_MISSING))?;

        let reference = request
            .single_template
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|encoded| Template::decode(encoded).ok())
            .ok_or(ServiceError::InvalidInput(SINGLE_TEMPLATE_INVALID))?;

        let candidates = encoded_candidates
            .iter()
            .enumerate()
            .map(|(index, entry)| decode_candidate(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let scores = compare_in_order(self.comparator.as_ref(), &reference, &candidates).await;

        let failed = scores
            .iter()
            .filter(|s| matches!(s, CandidateScore::Failed { .. }))
            .count();
        info!(candidates = candidates.len(), failed, "Batch comparison completed");

        Ok(scores)
    }

    /// List every stored template in the configured bucket
    #[instrument(skip(self))]
    pub async fn list_templates(&self) -> Result<Vec<TemplateEntry>, ServiceError> {
        let keys = self.store.list_objects(&self.bucket).await?;

        Ok(keys
            .into_iter()
            .map(|key| TemplateEntry {
                template: Template::new(&self.bucket, key.as_str()).encode(),
                name: key,
            })
            .collect())
    }

    /// Describe the comparison algorithm
    pub fn info(&self) -> AlgorithmInfo {
        AlgorithmInfo::current()
    }
}

/// Decode one `TemplateList` entry; non-string entries are malformed
fn decode_candidate(index: usize, entry: &Value) -> Result<Template, ServiceError> {
    let encoded = entry.as_str().ok_or_else(|| {
        warn!(index, "Rejecting non-string candidate template");
        ServiceError::InvalidInput(TEMPLATE_LIST_INVALID)
    })?;

    Template::decode(encoded).map_err(|e| {
        warn!(index, error = %e, "Rejecting malformed candidate template");
        ServiceError::InvalidInput(TEMPLATE_LIST_INVALID)
    })
}
