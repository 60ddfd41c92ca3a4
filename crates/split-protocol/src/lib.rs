mod http;

pub use http::{ClientOptions, HttpFetcher};
