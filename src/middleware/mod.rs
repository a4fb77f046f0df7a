//! The tasks service request pipeline, outermost first:
//! request id, request logging, metrics, security headers, CSRF.
//! The auth service uses only the first two.

pub mod csrf;
pub mod metrics;
pub mod request_id;
pub mod request_logger;
pub mod security_headers;

pub use csrf::{CsrfMiddleware, CSRF_HEADER};
pub use metrics::{HttpMetrics, MetricsMiddleware};
pub use request_id::{RequestId, RequestIdMiddleware, REQUEST_ID_HEADER};
pub use request_logger::RequestLogger;
pub use security_headers::security_headers;
