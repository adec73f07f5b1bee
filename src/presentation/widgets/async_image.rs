//! Declarative image component.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::application::services::FetchCoordinator;
use crate::domain::entities::{LoadingState, SharedImage};

/// What a host should draw for an [`AsyncImage`].
#[derive(Debug)]
pub enum Rendered<'a, L, F> {
    /// The loading slot.
    Loading(&'a L),
    /// The failure slot.
    Failure(&'a F),
    /// The resolved image.
    Image(SharedImage),
}

/// Picks the slot for a phase. Pure; [`AsyncImage::render`] feeds it.
#[must_use]
pub fn render_phase<'a, L, F>(
    phase: LoadingState,
    image: Option<&SharedImage>,
    loading: &'a L,
    failure: &'a F,
) -> Rendered<'a, L, F> {
    match (phase, image) {
        (LoadingState::Success, Some(image)) => Rendered::Image(image.clone()),
        (LoadingState::Failure, _) => Rendered::Failure(failure),
        _ => Rendered::Loading(loading),
    }
}

#[derive(Debug, Default)]
struct Phase {
    generation: u64,
    state: LoadingState,
    image: Option<SharedImage>,
}

/// An image bound to a reactive locator input.
///
/// Changing the locator resets to [`LoadingState::Loading`] and starts a new
/// load; results of loads started for an earlier locator are discarded.
/// Results are applied on the coordinator's UI executor, and subscribers are
/// notified of every state change.
pub struct AsyncImage {
    coordinator: FetchCoordinator,
    locator: Option<String>,
    phase: Arc<Mutex<Phase>>,
    changes: watch::Sender<LoadingState>,
}

impl AsyncImage {
    /// Creates the component and starts loading `locator`.
    #[must_use]
    pub fn new(coordinator: FetchCoordinator, locator: Option<&str>) -> Self {
        let (changes, _) = watch::channel(LoadingState::Loading);
        let image = Self {
            coordinator,
            locator: locator.map(str::to_owned),
            phase: Arc::new(Mutex::new(Phase::default())),
            changes,
        };
        image.start_load();
        image
    }

    /// Updates the locator input. Does nothing if it is unchanged.
    pub fn set_locator(&mut self, locator: Option<&str>) {
        if self.locator.as_deref() == locator {
            return;
        }
        self.locator = locator.map(str::to_owned);
        self.start_load();
    }

    /// Returns the current locator input.
    #[must_use]
    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    /// Returns the current loading state.
    #[must_use]
    pub fn state(&self) -> LoadingState {
        self.phase.lock().state
    }

    /// Returns the resolved image, if the current locator succeeded.
    #[must_use]
    pub fn image(&self) -> Option<SharedImage> {
        self.phase.lock().image.clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadingState> {
        self.changes.subscribe()
    }

    /// Chooses between the loading slot, the failure slot and the image.
    #[must_use]
    pub fn render<'a, L, F>(&self, loading: &'a L, failure: &'a F) -> Rendered<'a, L, F> {
        let phase = self.phase.lock();
        render_phase(phase.state, phase.image.as_ref(), loading, failure)
    }

    fn start_load(&self) {
        let generation = {
            let mut phase = self.phase.lock();
            phase.generation += 1;
            phase.state = LoadingState::Loading;
            phase.image = None;
            phase.generation
        };
        self.changes.send_replace(LoadingState::Loading);

        let locator = self.locator.clone();
        let phase = Arc::downgrade(&self.phase);
        let changes = self.changes.clone();

        // Runs on the UI executor, or inline for an invalid locator.
        self.coordinator
            .resolve(self.locator.as_deref(), None, move |delivery| {
                if !delivery.is_terminal() {
                    return;
                }
                let Some(phase) = phase.upgrade() else {
                    return;
                };
                let mut phase = phase.lock();
                if phase.generation != generation {
                    trace!(locator = ?locator, "Discarding result for a replaced locator");
                    return;
                }

                match delivery.into_result() {
                    Ok(image) => {
                        phase.image = Some(image);
                        phase.state = LoadingState::Success;
                    }
                    Err(e) => {
                        debug!(locator = ?locator, error = %e, "Image failed to load");
                        phase.state = LoadingState::Failure;
                    }
                }
                changes.send_replace(phase.state);
            });
    }
}

impl std::fmt::Debug for AsyncImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncImage")
            .field("locator", &self.locator)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::entities::CacheKey;
    use crate::domain::ports::mocks::{MockImageFetcher, png_bytes};
    use crate::infrastructure::dispatch::UiQueue;
    use crate::infrastructure::image::MemoryImageCache;

    const A: &str = "https://example.test/a.png";
    const B: &str = "https://example.test/b.png";
    const BROKEN: &str = "https://example.test/broken.png";

    fn setup(fetcher: MockImageFetcher) -> (FetchCoordinator, Arc<MockImageFetcher>) {
        let fetcher = Arc::new(
            fetcher
                .with_bytes(A, png_bytes(2, 2))
                .with_bytes(B, png_bytes(6, 6))
                .with_error(BROKEN, "refused"),
        );
        let coordinator = FetchCoordinator::builder()
            .cache(Arc::new(MemoryImageCache::new(8)))
            .fetcher(fetcher.clone())
            .build()
            .unwrap();
        (coordinator, fetcher)
    }

    async fn settled(rx: &mut watch::Receiver<LoadingState>) -> LoadingState {
        let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.is_loading()))
            .await
            .expect("load timed out")
            .expect("component dropped");
        *state
    }

    #[test]
    fn test_render_phase_is_pure() {
        let img: SharedImage = Arc::new(image::DynamicImage::new_rgb8(1, 1));
        let (loading, failure) = ("spinner", "broken");

        assert!(matches!(
            render_phase(LoadingState::Loading, None, &loading, &failure),
            Rendered::Loading(&"spinner")
        ));
        assert!(matches!(
            render_phase(LoadingState::Failure, Some(&img), &loading, &failure),
            Rendered::Failure(&"broken")
        ));
        assert!(matches!(
            render_phase(LoadingState::Success, Some(&img), &loading, &failure),
            Rendered::Image(_)
        ));
    }

    #[tokio::test]
    async fn test_renders_image_on_success() {
        let (coordinator, _fetcher) = setup(MockImageFetcher::new());
        let component = AsyncImage::new(coordinator, Some(A));
        let mut rx = component.subscribe();

        assert_eq!(settled(&mut rx).await, LoadingState::Success);
        match component.render(&(), &()) {
            Rendered::Image(image) => assert_eq!(image.width(), 2),
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_renders_failure_slot_on_error() {
        let (coordinator, _fetcher) = setup(MockImageFetcher::new());
        let component = AsyncImage::new(coordinator, Some(BROKEN));
        let mut rx = component.subscribe();

        assert_eq!(settled(&mut rx).await, LoadingState::Failure);
        assert!(matches!(
            component.render(&"loading", &"failed"),
            Rendered::Failure(&"failed")
        ));
        assert!(component.image().is_none());
    }

    #[tokio::test]
    async fn test_locator_change_discards_stale_result() {
        let (coordinator, fetcher) = setup(MockImageFetcher::new().hold(A));
        let mut component = AsyncImage::new(coordinator.clone(), Some(A));
        let mut rx = component.subscribe();

        component.set_locator(Some(B));
        assert_eq!(settled(&mut rx).await, LoadingState::Success);

        fetcher.release_url(A);
        for _ in 0..200 {
            if coordinator.pending_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Let the stale completion run.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(coordinator.cache().get(&CacheKey::new(A)).is_some());
        assert_eq!(component.state(), LoadingState::Success);
        assert_eq!(component.image().unwrap().width(), 6);
    }

    #[tokio::test]
    async fn test_result_is_applied_only_on_ui_loop() {
        let fetcher = Arc::new(MockImageFetcher::new().with_bytes(A, png_bytes(2, 2)));
        let (queue, mut ui_loop) = UiQueue::new();
        let coordinator = FetchCoordinator::builder()
            .cache(Arc::new(MemoryImageCache::new(8)))
            .fetcher(fetcher)
            .executor(Arc::new(queue))
            .build()
            .unwrap();
        let component = AsyncImage::new(coordinator.clone(), Some(A));

        for _ in 0..200 {
            if coordinator.pending_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(component.state(), LoadingState::Loading);
        assert!(component.image().is_none());

        assert_eq!(ui_loop.run_pending(), 1);
        assert_eq!(component.state(), LoadingState::Success);
        assert_eq!(*component.subscribe().borrow(), LoadingState::Success);
    }

    #[tokio::test]
    async fn test_unchanged_locator_does_not_reload() {
        let (coordinator, fetcher) = setup(MockImageFetcher::new());
        let mut component = AsyncImage::new(coordinator, Some(A));
        let mut rx = component.subscribe();
        settled(&mut rx).await;

        component.set_locator(Some(A));

        assert_eq!(component.state(), LoadingState::Success);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_locator_renders_failure() {
        let (coordinator, fetcher) = setup(MockImageFetcher::new());
        let component = AsyncImage::new(coordinator, None);
        let mut rx = component.subscribe();

        assert_eq!(settled(&mut rx).await, LoadingState::Failure);
        assert_eq!(fetcher.call_count(), 0);
    }
}
