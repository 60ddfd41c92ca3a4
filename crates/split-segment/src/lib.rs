mod splitter;

pub use splitter::{chunk_size, plan};
