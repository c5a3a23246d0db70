pub mod http;
pub mod proxydb;
pub mod text_list;
