//! Concrete completion driver implementations.

pub mod http;

pub use http::HttpDriver;
