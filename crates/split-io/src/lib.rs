mod writer;

pub use writer::{OutputFile, RangeWriter, DEFAULT_BUFFER_SIZE};
