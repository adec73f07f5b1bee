//! Cache-first image resolution with request coalescing.
//!
//! A resolve call checks the memory cache, otherwise joins (or starts) the
//! single in-flight fetch for its key. Fetch and decode run on the worker
//! runtime; every delivery is posted to the UI executor.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};

use crate::domain::entities::{CacheKey, Delivery, FetchRequest, Locator, SharedImage};
use crate::domain::errors::{FetchError, SetupError};
use crate::domain::ports::{ImageDecoder, ImageFetcher, ResourceCache, UiExecutor};
use crate::infrastructure::dispatch::ImmediateExecutor;
use crate::infrastructure::image::{ImageCrateDecoder, MemoryImageCache, NetworkFetcher};

type Waiter = Box<dyn FnOnce(Result<SharedImage, FetchError>) + Send + 'static>;

const SHARED_WORKER_THREADS: usize = 2;

/// Resolves locators to decoded images, sharing one fetch per key.
///
/// Cloning is cheap; clones share the cache and the in-flight table.
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    cache: Arc<dyn ResourceCache>,
    fetcher: Arc<dyn ImageFetcher>,
    decoder: Arc<dyn ImageDecoder>,
    executor: Arc<dyn UiExecutor>,
    runtime: Handle,
    in_flight: Mutex<HashMap<CacheKey, Vec<Waiter>>>,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("cached", &self.inner.cache.len())
            .field("in_flight", &self.pending_count())
            .finish_non_exhaustive()
    }
}

/// Builder for [`FetchCoordinator`].
///
/// Unset parts default to a [`MemoryImageCache`], a [`NetworkFetcher`], an
/// [`ImageCrateDecoder`], an [`ImmediateExecutor`] and the current runtime.
#[derive(Default)]
pub struct FetchCoordinatorBuilder {
    cache: Option<Arc<dyn ResourceCache>>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    decoder: Option<Arc<dyn ImageDecoder>>,
    executor: Option<Arc<dyn UiExecutor>>,
    runtime: Option<Handle>,
}

impl FetchCoordinatorBuilder {
    /// Sets the resource cache.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn ResourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the fetch primitive.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the decode primitive.
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the UI-safe execution context.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn UiExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the runtime used for fetch and decode work.
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the coordinator.
    ///
    /// # Errors
    /// Returns error if no runtime was given and none is current, or if the
    /// default fetcher cannot be created.
    pub fn build(self) -> Result<FetchCoordinator, SetupError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| SetupError::NoRuntime)?,
        };

        let fetcher: Arc<dyn ImageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(NetworkFetcher::with_defaults()?),
        };

        Ok(FetchCoordinator {
            inner: Arc::new(Inner {
                cache: self
                    .cache
                    .unwrap_or_else(|| Arc::new(MemoryImageCache::default())),
                fetcher,
                decoder: self
                    .decoder
                    .unwrap_or_else(|| Arc::new(ImageCrateDecoder::new())),
                executor: self.executor.unwrap_or_else(|| Arc::new(ImmediateExecutor)),
                runtime,
                in_flight: Mutex::new(HashMap::new()),
            }),
        })
    }
}

struct SharedDefault {
    _runtime: Runtime,
    coordinator: FetchCoordinator,
}

static SHARED: OnceLock<Result<SharedDefault, String>> = OnceLock::new();

impl FetchCoordinator {
    /// Starts building a coordinator.
    #[must_use]
    pub fn builder() -> FetchCoordinatorBuilder {
        FetchCoordinatorBuilder::default()
    }

    /// Returns the process-wide default coordinator, creating it on first use.
    ///
    /// It owns a small worker runtime, a default-sized memory cache and
    /// delivers inline. Prefer explicitly built instances where the host has
    /// its own runtime or UI loop; the default lives until process exit.
    ///
    /// # Errors
    /// Returns error if the worker runtime or HTTP client failed to start.
    pub fn shared() -> Result<&'static Self, SetupError> {
        SHARED
            .get_or_init(|| Self::build_shared().map_err(|e| e.to_string()))
            .as_ref()
            .map(|shared| &shared.coordinator)
            .map_err(|e| SetupError::Shared(e.clone()))
    }

    fn build_shared() -> Result<SharedDefault, SetupError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(SHARED_WORKER_THREADS)
            .thread_name("pixfetch-worker")
            .enable_all()
            .build()?;

        let coordinator = Self::builder().runtime(runtime.handle().clone()).build()?;
        debug!("Created shared fetch coordinator");

        Ok(SharedDefault {
            _runtime: runtime,
            coordinator,
        })
    }

    /// Returns the resource cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ResourceCache> {
        &self.inner.cache
    }

    /// Returns the UI-safe execution context.
    #[must_use]
    pub fn executor(&self) -> &Arc<dyn UiExecutor> {
        &self.inner.executor
    }

    /// Resolves `locator`, reporting through `callback`.
    ///
    /// The callback sees at most one interim delivery (the placeholder, on a
    /// cache miss) and then exactly one terminal delivery. An absent or
    /// unparseable locator is reported synchronously on the calling thread;
    /// everything else arrives on the UI executor.
    pub fn resolve<F>(
        &self,
        locator: Option<&str>,
        placeholder: Option<SharedImage>,
        mut callback: F,
    ) where
        F: FnMut(Delivery) + Send + 'static,
    {
        match Locator::from_optional(locator) {
            Ok(locator) => {
                let request = FetchRequest {
                    locator,
                    placeholder,
                };
                self.resolve_request(request, callback);
            }
            Err(err) => {
                debug!(locator = ?locator, "Rejected invalid locator");
                callback(Delivery::failed(None, err));
            }
        }
    }

    /// Resolves an already validated request. See [`Self::resolve`].
    pub fn resolve_request<F>(&self, request: FetchRequest, callback: F)
    where
        F: FnMut(Delivery) + Send + 'static,
    {
        let FetchRequest {
            locator,
            placeholder,
        } = request;
        let key = locator.key().clone();
        let callback = Arc::new(Mutex::new(callback));

        if let Some(image) = self.inner.cache.get(&key) {
            trace!(key = %key, "Resolved from memory cache");
            self.post(&callback, Delivery::loaded(key, image));
            return;
        }

        if let Some(placeholder) = placeholder {
            self.post(&callback, Delivery::placeholder(key.clone(), placeholder));
        }

        let executor = self.inner.executor.clone();
        let waiter: Waiter = Box::new(move |result| {
            executor.execute(Box::new(move || {
                let mut callback = callback.lock();
                (*callback)(Delivery::terminal(key, result));
            }));
        });

        self.inner.join(locator, waiter);
    }

    /// Resolves `locator` and waits for the terminal outcome.
    ///
    /// Built on [`Self::resolve`]: the placeholder delivery is ignored, and a
    /// terminal delivery with neither image nor error, or a callback dropped
    /// before delivering, becomes `FetchError::NoImageProduced`.
    ///
    /// # Errors
    /// Returns the terminal error of the resolve call.
    pub async fn resolve_async(
        &self,
        locator: Option<&str>,
        placeholder: Option<SharedImage>,
    ) -> Result<SharedImage, FetchError> {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);

        self.resolve(locator, placeholder, move |delivery| {
            if !delivery.is_terminal() {
                return;
            }
            if let Some(tx) = tx.take() {
                let _ = tx.send(delivery.into_result());
            }
        });

        rx.await.unwrap_or(Err(FetchError::NoImageProduced))
    }

    /// Warms the cache for `locators` without delivering anything.
    /// Invalid locators are skipped with a warning.
    pub fn prefetch<I, S>(&self, locators: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for input in locators {
            let input = input.as_ref();
            let locator = match Locator::parse(input) {
                Ok(locator) => locator,
                Err(e) => {
                    warn!(locator = input, error = %e, "Skipping prefetch");
                    continue;
                }
            };

            if self.inner.cache.peek(locator.key()).is_some() {
                continue;
            }

            self.inner.join(locator, Box::new(|_| {}));
        }
    }

    /// Returns true if a fetch for `key` is in flight.
    #[must_use]
    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.inner.in_flight.lock().contains_key(key)
    }

    /// Returns the number of keys with a fetch in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Drops every cached image. In-flight fetches still populate the cache.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        debug!("Cleared resource cache");
    }

    fn post<F>(&self, callback: &Arc<Mutex<F>>, delivery: Delivery)
    where
        F: FnMut(Delivery) + Send + 'static,
    {
        let callback = callback.clone();
        self.inner.executor.execute(Box::new(move || {
            let mut callback = callback.lock();
            (*callback)(delivery);
        }));
    }
}

impl Inner {
    /// Attaches `waiter` to the in-flight fetch for the locator's key,
    /// starting one if none is running.
    fn join(self: &Arc<Self>, locator: Locator, waiter: Waiter) {
        let key = locator.key().clone();
        let mut in_flight = self.in_flight.lock();

        // A fetch may have finished between the caller's cache check and here.
        if let Some(image) = self.cache.peek(&key) {
            drop(in_flight);
            waiter(Ok(image));
            return;
        }

        if let Some(waiters) = in_flight.get_mut(&key) {
            waiters.push(waiter);
            debug!(key = %key, waiters = waiters.len(), "Joined in-flight fetch");
            return;
        }

        in_flight.insert(key, vec![waiter]);
        drop(in_flight);

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            inner.run_fetch(locator).await;
        });
    }

    async fn run_fetch(self: Arc<Self>, locator: Locator) {
        let key = locator.key().clone();

        let result = AssertUnwindSafe(self.fetch_and_decode(&locator))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(key = %key, "Image fetch panicked");
                Err(FetchError::NoImageProduced)
            });

        let waiters = self.in_flight.lock().remove(&key).unwrap_or_default();
        trace!(key = %key, waiters = waiters.len(), "Fanning out result");

        for waiter in waiters {
            waiter(result.clone());
        }
    }

    async fn fetch_and_decode(&self, locator: &Locator) -> Result<SharedImage, FetchError> {
        let key = locator.key();
        debug!(key = %key, "Fetching image");

        let bytes = self.fetcher.fetch(locator).await.map_err(|cause| {
            warn!(key = %key, error = %cause, "Image download failed");
            FetchError::from(cause)
        })?;

        let decoder = self.decoder.clone();
        let decoded = self
            .runtime
            .spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| {
                error!(key = %key, error = %e, "Image decode task panicked");
                FetchError::NoImageProduced
            })?
            .map_err(|e| {
                warn!(key = %key, error = %e, "Image decode failed");
                FetchError::from(e)
            })?;

        let image: SharedImage = Arc::new(decoded);
        self.cache.put(key.clone(), image.clone());

        debug!(key = %key, "Image loaded successfully");
        Ok(image)
    }
}
