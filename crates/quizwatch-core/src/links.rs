//! Opening external links (quiz forms, live sessions).

use std::sync::Mutex;

use crate::error::ActionError;

pub trait LinkOpener: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the link could not be handed off.
    fn open(&self, url: &str) -> Result<(), ActionError>;
}

/// Opens links in the user's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserOpener;

impl LinkOpener for BrowserOpener {
    fn open(&self, url: &str) -> Result<(), ActionError> {
        open::that(url).map_err(|e| ActionError::OpenFailed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Records links instead of opening them.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<(), ActionError> {
        tracing::info!(url, "open requested");
        self.opened
            .lock()
            .map_err(|e| ActionError::OpenFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?
            .push(url.to_string());
        Ok(())
    }
}
