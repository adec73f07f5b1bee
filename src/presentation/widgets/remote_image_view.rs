//! Imperative image view for reusable cells.
//!
//! A view may be reassigned to another locator while an older fetch is
//! still running. Terminal deliveries therefore re-read the cache with the
//! key the view currently wants instead of trusting the delivered image.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::application::services::FetchCoordinator;
use crate::domain::entities::{
    CacheKey, Delivery, DeliveryStage, LoadingState, Locator, SharedImage,
};
use crate::domain::ports::ResourceCache;

#[derive(Debug, Default)]
struct ViewState {
    desired: Option<CacheKey>,
    image: Option<SharedImage>,
    status: LoadingState,
}

impl ViewState {
    fn apply(&mut self, delivery: Delivery, cache: &dyn ResourceCache) {
        let is_current = delivery.key == self.desired;

        match delivery.stage {
            DeliveryStage::Interim => {
                if is_current && let Some(image) = delivery.image {
                    self.image = Some(image);
                }
            }
            DeliveryStage::Terminal => {
                if delivery.error.is_some() {
                    if is_current {
                        self.status = LoadingState::Failure;
                    }
                    return;
                }

                let fresh = self.desired.as_ref().and_then(|key| cache.peek(key));
                match (fresh, delivery.image) {
                    (Some(image), _) => self.set_loaded(image),
                    (None, Some(image)) if is_current => self.set_loaded(image),
                    (None, None) if is_current => self.status = LoadingState::Failure,
                    (None, _) => {
                        trace!(key = ?delivery.key, "Ignoring delivery for a superseded key");
                    }
                }
            }
        }
    }

    fn set_loaded(&mut self, image: SharedImage) {
        self.image = Some(image);
        self.status = LoadingState::Success;
    }
}

/// An image view that tracks the key it currently wants to display.
///
/// In-flight deliveries hold only a weak reference to the view state, so a
/// dropped view is never kept alive and late deliveries are ignored.
pub struct RemoteImageView {
    state: Arc<Mutex<ViewState>>,
    coordinator: FetchCoordinator,
}

impl RemoteImageView {
    /// Creates an empty view.
    #[must_use]
    pub fn new(coordinator: FetchCoordinator) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewState::default())),
            coordinator,
        }
    }

    /// Starts displaying `locator`.
    ///
    /// The placeholder, if any, is shown immediately; otherwise the current
    /// image stays until the new one arrives. Failures never clear content.
    pub fn update_image(&self, locator: Option<&str>, placeholder: Option<SharedImage>) {
        {
            let mut state = self.state.lock();
            state.desired = Locator::from_optional(locator)
                .ok()
                .map(|parsed| parsed.key().clone());
            if let Some(placeholder) = &placeholder {
                state.image = Some(placeholder.clone());
            }
            state.status = LoadingState::Loading;
        }

        let view = Arc::downgrade(&self.state);
        let cache = self.coordinator.cache().clone();

        self.coordinator.resolve(locator, placeholder, move |delivery| {
            let Some(state) = view.upgrade() else {
                trace!(key = ?delivery.key, "View dropped before delivery");
                return;
            };
            state.lock().apply(delivery, cache.as_ref());
        });
    }

    /// Forgets the current key and image, ready for reuse.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = ViewState::default();
    }

    /// Returns the displayed image.
    #[must_use]
    pub fn image(&self) -> Option<SharedImage> {
        self.state.lock().image.clone()
    }

    /// Returns the key the view currently wants.
    #[must_use]
    pub fn desired_key(&self) -> Option<CacheKey> {
        self.state.lock().desired.clone()
    }

    /// Returns the loading state for the current key.
    #[must_use]
    pub fn state(&self) -> LoadingState {
        self.state.lock().status
    }

    /// Returns true if an image is shown and the current key resolved.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let state = self.state.lock();
        state.image.is_some() && state.status.is_success()
    }
}

impl std::fmt::Debug for RemoteImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RemoteImageView")
            .field("desired", &state.desired)
            .field("has_image", &state.image.is_some())
            .field("status", &state.status)
            .finish_non_exhaustive()
    }
}
