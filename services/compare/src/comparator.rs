use crate::config::RekognitionConfig;
use crate::template::Template;
use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::config::Builder as RekognitionConfigBuilder;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client as RekognitionClient;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Errors returned by the face comparator
#[derive(Error, Debug)]
pub enum ComparatorError {
    #[error("Face comparison request failed: {0}")]
    Request(String),
}

/// Pairwise face comparison between two stored images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FaceComparator: Send + Sync {
    /// Compare the face in `source` against the faces in `target`.
    ///
    /// Returns the highest reported similarity as a percentage (0-100), or
    /// `None` when the comparator found no matching face.
    async fn compare(
        &self,
        source: &Template,
        target: &Template,
    ) -> Result<Option<f32>, ComparatorError>;
}

/// Face comparator backed by AWS Rekognition `CompareFaces`
pub struct RekognitionComparator {
    client: RekognitionClient,
    similarity_threshold: Option<f32>,
}

impl RekognitionComparator {
    /// Create a new Rekognition comparator
    pub async fn new(config: &RekognitionConfig) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = RekognitionConfigBuilder::from(&aws_config);

        if let Some(ref endpoint_url) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        let client = RekognitionClient::from_conf(builder.build());

        info!(
            region = %config.region,
            similarity_threshold = ?config.similarity_threshold,
            "Rekognition comparator initialized"
        );

        Ok(Self {
            client,
            similarity_threshold: config.similarity_threshold,
        })
    }
}

#[async_trait]
impl FaceComparator for RekognitionComparator {
    #[instrument(skip_all, fields(source = %source.name(), target = %target.name()))]
    async fn compare(
        &self,
        source: &Template,
        target: &Template,
    ) -> Result<Option<f32>, ComparatorError> {
        let response = self
            .client
            .compare_faces()
            .source_image(to_image(source))
            .target_image(to_image(target))
            .set_similarity_threshold(self.similarity_threshold)
            .send()
            .await
            .map_err(|e| ComparatorError::Request(DisplayErrorContext(&e).to_string()))?;

        let similarities: Vec<f32> = response
            .face_matches()
            .iter()
            .filter_map(|m| m.similarity())
            .collect();

        debug!(matches = similarities.len(), "CompareFaces completed");

        Ok(best_similarity(&similarities))
    }
}

/// Build a Rekognition image reference from a template
fn to_image(template: &Template) -> Image {
    Image::builder()
        .s3_object(
            S3Object::builder()
                .bucket(template.bucket())
                .name(template.name())
                .build(),
        )
        .build()
}

/// Highest similarity among reported matches
fn best_similarity(similarities: &[f32]) -> Option<f32> {
    similarities.iter().copied().reduce(f32::max)
}
