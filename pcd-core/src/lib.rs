pub mod error;
pub mod pointcloud;
pub mod stage;

pub use error::{Error, Result};
