pub mod colorization;
pub mod stats;
