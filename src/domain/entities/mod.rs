//! Domain entity definitions.

mod resource;

pub use resource::{
    CacheKey, Delivery, DeliveryStage, FetchRequest, LoadingState, Locator, SharedImage,
};
