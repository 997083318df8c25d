pub mod buffer;
pub mod dimension;
pub mod metadata;
pub mod schema;
