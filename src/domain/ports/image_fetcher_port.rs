//! Port definition for retrieving raw image payloads.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::Locator;
use crate::domain::errors::TransportError;

/// Port for fetching the bytes behind a locator.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetches the payload for `locator`.
    async fn fetch(&self, locator: &Locator) -> Result<Bytes, TransportError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    /// Scripted fetcher for testing.
    ///
    /// Unknown locators fail with a transport error. A gated fetcher holds
    /// every request until [`MockImageFetcher::release`] is called; a held
    /// URL waits for [`MockImageFetcher::release_url`].
    pub struct MockImageFetcher {
        responses: Mutex<HashMap<String, Result<Bytes, TransportError>>>,
        calls: Mutex<Vec<String>>,
        call_count: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
        url_gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    }

    impl MockImageFetcher {
        /// Creates a fetcher that answers immediately.
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
                gate: None,
                url_gates: Mutex::new(HashMap::new()),
            }
        }

        /// Creates a fetcher whose requests wait for `release`.
        pub fn gated() -> Self {
            Self {
                gate: Some(Arc::new(Semaphore::new(0))),
                ..Self::new()
            }
        }

        /// Registers a successful payload.
        pub fn with_bytes(self, url: &str, bytes: impl Into<Bytes>) -> Self {
            self.responses
                .lock()
                .insert(url.to_string(), Ok(bytes.into()));
            self
        }

        /// Registers a transport failure.
        pub fn with_error(self, url: &str, message: &str) -> Self {
            self.responses
                .lock()
                .insert(url.to_string(), Err(TransportError::new(message)));
            self
        }

        /// Holds requests for `url` until `release_url`.
        pub fn hold(self, url: &str) -> Self {
            self.url_gates
                .lock()
                .insert(url.to_string(), Arc::new(Semaphore::new(0)));
            self
        }

        /// Lets one held request for `url` proceed.
        pub fn release_url(&self, url: &str) {
            if let Some(gate) = self.url_gates.lock().get(url) {
                gate.add_permits(1);
            }
        }

        /// Lets `n` held requests proceed.
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        /// Returns the number of fetches started.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Returns the number of fetches started for `url`.
        pub fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().iter().filter(|u| *u == url).count()
        }
    }

    impl Default for MockImageFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ImageFetcher for MockImageFetcher {
        async fn fetch(&self, locator: &Locator) -> Result<Bytes, TransportError> {
            let key = locator.key().as_str().to_string();
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().push(key.clone());

            let url_gate = self.url_gates.lock().get(&key).cloned();
            if let Some(gate) = url_gate.as_ref().or(self.gate.as_ref()) {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|_| TransportError::new("gate closed"))?;
                permit.forget();
            }

            self.responses
                .lock()
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Err(TransportError::new(format!("no route for {key}"))))
        }
    }

    /// Encodes a solid-colour PNG of the given size.
    pub fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)
            .expect("encode test png");
        Bytes::from(buf.into_inner())
    }
}
