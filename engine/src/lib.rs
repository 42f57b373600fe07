//! Runtime engine for sortcam.
//!
//! This crate drives the sans-IO session from `sortcam-core` on a tokio task:
//! it runs the dwell and countdown timers, samples the video source, posts
//! captures to the classifier and publishes snapshots for the UI.

use std::sync::Arc;

pub use sortcam_core::{self, PhaseTag, SessionSnapshot, SessionTiming};
pub use sortcam_providers::{self, BackendTarget, Dispatcher};
pub use sortcam_types::{
    ClassificationFailure, ClassificationResult, Landmark, LandmarkFrame, MaterialCode,
    Observation,
};

pub mod capture;
mod classifier;
mod config;
mod runtime;

pub use capture::{
    CaptureError, FrameSize, FrameSlot, JPEG_QUALITY, StillImageSource, VideoFrame, VideoSource,
};
pub use classifier::{Classifier, ClassifyFut};
pub use config::{
    BackendConfig, BackendMode, CaptureConfig, ConfigError, EngineSettings, SortcamConfig,
    config_path, expand_env_vars,
};
pub use runtime::{EngineError, EngineHandle, EngineOptions, spawn_engine};

/// Build the HTTP dispatcher from `settings` and start an engine on it.
pub fn start(
    settings: &EngineSettings,
    source: Arc<dyn VideoSource>,
) -> Result<(EngineHandle, tokio::task::JoinHandle<()>), reqwest::Error> {
    let client = sortcam_providers::http_client(settings.timeouts)?;
    let dispatcher = Dispatcher::new(client, settings.endpoints.clone());
    Ok(spawn_engine(
        EngineOptions::from(settings),
        source,
        Arc::new(dispatcher),
    ))
}
