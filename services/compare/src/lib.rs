//! Facematch Compare Service
//!
//! HTTP service that stores face images as templates in S3 and scores one
//! template against an ordered list of others using AWS Rekognition.
//!
//! ## Endpoints
//!
//! - **`POST /create_template`**: store base64 image bytes, return a template
//! - **`POST /compare_list`**: compare a template against a list, return one
//!   normalized score (or `null` on comparator failure) per list entry
//! - **`GET /get_list`**: list stored templates with their object keys
//! - **`GET /info`**: static algorithm description
//!
//! ## Architecture
//!
//! ```text
//!  HTTP (axum)              TemplateService             External
//! ┌──────────────┐         ┌──────────────┐          ┌──────────────┐
//! │ create_      │────────▶│ create_      │─────────▶│ S3           │
//! │ template     │         │ template     │          │ put / list   │
//! │ get_list     │────────▶│ list_        │─────────▶│              │
//! └──────────────┘         │ templates    │          └──────────────┘
//! ┌──────────────┐         ├──────────────┤          ┌──────────────┐
//! │ compare_list │────────▶│ Sequencer    │─────────▶│ Rekognition  │
//! └──────────────┘         │ (one at a    │  1 call  │ CompareFaces │
//!                          │  time)       │  at once └──────────────┘
//!                          └──────────────┘
//! ```

pub mod api;
pub mod comparator;
pub mod config;
pub mod error;
pub mod info;
pub mod object_store;
pub mod sequencer;
pub mod service;
pub mod template;

pub use api::{create_router, start_api_server, AppState};
pub use comparator::{ComparatorError, FaceComparator, RekognitionComparator};
pub use config::Config;
pub use error::ServiceError;
pub use info::AlgorithmInfo;
pub use object_store::{ObjectStore, S3ObjectStore, StoreError};
pub use sequencer::{compare_in_order, CandidateScore};
pub use service::{CompareListRequest, CreateTemplateRequest, TemplateEntry, TemplateService};
pub use template::{ObjectRef, Template, TemplateError};
