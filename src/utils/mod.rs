pub mod http_retry;
pub mod transform;
