//! An HTTP service that removes watermarks from uploaded images by handing
//! them to a generative image model and returning the image it produces.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod upload;
