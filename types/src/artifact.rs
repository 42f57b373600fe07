use std::fmt;

/// A single encoded still frame.
///
/// Deliberately not `Clone`: an artifact is produced once per countdown and
/// moved into exactly one classification request.
pub struct CaptureArtifact {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

impl CaptureArtifact {
    #[must_use]
    pub fn new(jpeg: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            jpeg,
            width,
            height,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.jpeg
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

// Manual Debug impl to keep multi-megabyte buffers out of logs.
impl fmt::Debug for CaptureArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureArtifact")
            .field("bytes", &self.jpeg.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
