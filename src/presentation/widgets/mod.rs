mod async_image;
mod remote_image_view;

pub use async_image::{AsyncImage, Rendered, render_phase};
pub use remote_image_view::RemoteImageView;
