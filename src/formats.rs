mod api;
mod codec;
mod error;
mod nd2;
mod raster;
mod reduce;
mod tiff;
mod util;

#[cfg(test)]
mod tests;

pub(crate) use api::describe_stack;
pub use api::{
    ImageInfo, describe_image, is_supported_image, load_image, read_channels, supported_formats,
};
pub use codec::{DefaultImageReader, ImageReader};
pub use error::{IoError, Result};
pub use reduce::{ChannelStack, reduce_channels};
