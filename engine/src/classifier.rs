//! Seam between the runtime and the classification backend.

use std::future::Future;
use std::pin::Pin;

use sortcam_providers::{BackendTarget, DispatchError, Dispatcher};
use sortcam_types::{CaptureArtifact, ClassificationResult};

/// Classification future type alias.
pub type ClassifyFut = Pin<Box<dyn Future<Output = Result<ClassificationResult, DispatchError>> + Send>>;

/// Anything that can classify one capture against a backend target.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, artifact: CaptureArtifact, target: BackendTarget) -> ClassifyFut;
}

impl Classifier for Dispatcher {
    fn classify(&self, artifact: CaptureArtifact, target: BackendTarget) -> ClassifyFut {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.dispatch(artifact, &target).await })
    }
}
