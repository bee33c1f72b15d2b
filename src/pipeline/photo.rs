//! One-shot still capture requests

use image::RgbaImage;
use tracing::debug;

pub type PhotoCallback = Box<dyn FnOnce(RgbaImage) + Send + 'static>;

/// Holds at most one outstanding capture request.
///
/// A new request replaces an unfulfilled one and the replaced callback is
/// dropped without ever being called. Callers that need every request
/// answered must wait for their callback before asking again.
#[derive(Default)]
pub struct PhotoGate {
    pending: Option<PhotoCallback>,
}

impl PhotoGate {
    /// Register a request, handing back the callback it superseded.
    ///
    /// The returned callback must not be called; callers drop it once any
    /// lock guarding the gate is released.
    #[must_use]
    pub fn request(&mut self, callback: PhotoCallback) -> Option<PhotoCallback> {
        let replaced = self.pending.replace(callback);
        if replaced.is_some() {
            debug!("pending photo request superseded");
        }
        replaced
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Clear the request, handing back its callback for fulfilment.
    pub fn take(&mut self) -> Option<PhotoCallback> {
        self.pending.take()
    }

    /// Withdraw the request unanswered, handing back its callback so it can
    /// be dropped outside the caller's lock.
    #[must_use]
    pub fn cancel(&mut self) -> Option<PhotoCallback> {
        self.pending.take()
    }
}
