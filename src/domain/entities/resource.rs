//! Domain types for remote image resolution.

use std::sync::Arc;

use reqwest::Url;

use crate::domain::errors::FetchError;

/// A decoded image shared between the cache and any number of views.
pub type SharedImage = Arc<image::DynamicImage>;

/// Lookup key for the resource cache.
///
/// Built from the exact locator text. Two locators that only differ in
/// case, query order or trailing slashes are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a new `CacheKey` from any string-like input.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A validated, absolute resource address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    url: Url,
    key: CacheKey,
}

impl Locator {
    /// Parses an absolute URL.
    ///
    /// The cache key is the input text itself, not the normalized URL.
    ///
    /// # Errors
    /// Returns `FetchError::InvalidLocator` if the input is blank or is not
    /// an absolute URL.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        if input.trim().is_empty() {
            return Err(FetchError::invalid_locator(input));
        }

        let url = Url::parse(input).map_err(|_| FetchError::invalid_locator(input))?;

        Ok(Self {
            url,
            key: CacheKey::new(input),
        })
    }

    /// Parses an optional locator; `None` is treated as invalid.
    ///
    /// # Errors
    /// Returns `FetchError::InvalidLocator` if the input is absent or unparseable.
    pub fn from_optional(input: Option<&str>) -> Result<Self, FetchError> {
        input.map_or_else(|| Err(FetchError::invalid_locator("")), Self::parse)
    }

    /// Returns the parsed URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the cache key derived from this locator.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Returns the URL scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

impl std::str::FromStr for Locator {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A single resolve invocation. Discarded once its terminal delivery fires.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Where to fetch from.
    pub locator: Locator,
    /// Interim content shown while the fetch is in flight.
    pub placeholder: Option<SharedImage>,
}

impl FetchRequest {
    /// Creates a request without a placeholder.
    #[must_use]
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            placeholder: None,
        }
    }

    /// Sets the placeholder.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: SharedImage) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Returns the cache key of the request.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        self.locator.key()
    }
}

/// Whether a delivery ends a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    /// Placeholder shown while the fetch runs.
    Interim,
    /// Final outcome.
    Terminal,
}

/// Payload handed to a resolve callback.
///
/// A resolve call produces zero or one interim delivery followed by exactly
/// one terminal delivery.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Interim or terminal.
    pub stage: DeliveryStage,
    /// Key the delivery belongs to, if the locator could be parsed.
    pub key: Option<CacheKey>,
    /// Delivered image, if any.
    pub image: Option<SharedImage>,
    /// Delivered error, if any.
    pub error: Option<FetchError>,
}

impl Delivery {
    /// Interim delivery of a placeholder.
    #[must_use]
    pub fn placeholder(key: CacheKey, image: SharedImage) -> Self {
        Self {
            stage: DeliveryStage::Interim,
            key: Some(key),
            image: Some(image),
            error: None,
        }
    }

    /// Terminal success.
    #[must_use]
    pub fn loaded(key: CacheKey, image: SharedImage) -> Self {
        Self {
            stage: DeliveryStage::Terminal,
            key: Some(key),
            image: Some(image),
            error: None,
        }
    }

    /// Terminal failure.
    #[must_use]
    pub fn failed(key: Option<CacheKey>, error: FetchError) -> Self {
        Self {
            stage: DeliveryStage::Terminal,
            key,
            image: None,
            error: Some(error),
        }
    }

    /// Terminal outcome from a shared result.
    #[must_use]
    pub fn terminal(key: CacheKey, result: Result<SharedImage, FetchError>) -> Self {
        match result {
            Ok(image) => Self::loaded(key, image),
            Err(error) => Self::failed(Some(key), error),
        }
    }

    /// Returns true if this delivery ends the resolve call.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.stage == DeliveryStage::Terminal
    }

    /// Collapses a terminal delivery into a single outcome.
    ///
    /// # Errors
    /// Returns the delivered error, or `FetchError::NoImageProduced` when the
    /// delivery carries neither an image nor an error.
    pub fn into_result(self) -> Result<SharedImage, FetchError> {
        match (self.image, self.error) {
            (_, Some(error)) => Err(error),
            (Some(image), None) => Ok(image),
            (None, None) => Err(FetchError::NoImageProduced),
        }
    }
}

/// Display state of a presentation adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingState {
    /// Waiting for the terminal delivery.
    #[default]
    Loading,
    /// An image for the current key is shown.
    Success,
    /// The current key failed to load.
    Failure,
}

impl LoadingState {
    /// Returns true while waiting for a result.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if the current key resolved.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the current key failed.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl std::fmt::Display for LoadingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}
