mod accumulator;

pub use accumulator::{percentage, Progress};
