//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use imgdedup_core::{AdmissionPipeline, Repository};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Admission pipeline shared by all requests; it holds no per-request state
    pub pipeline: Arc<AdmissionPipeline>,
    /// Maximum accepted file size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Build the pipeline over `repo` from the detection and storage settings.
    pub fn new(repo: Arc<dyn Repository>, config: &Config) -> Self {
        let pipeline = AdmissionPipeline::new(repo, config.detection.clone(), &config.storage);
        Self {
            pipeline: Arc::new(pipeline),
            max_file_size: config.max_file_size(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        self.pipeline.repository()
    }
}
