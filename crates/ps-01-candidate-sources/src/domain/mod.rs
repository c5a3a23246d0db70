pub mod errors;
pub mod lines;
pub mod proxydb;
pub mod retry_after;
