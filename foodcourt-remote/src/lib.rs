mod http;
mod server;

pub use http::HttpBackend;
pub use server::API_BASE_URL;
