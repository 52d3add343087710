//! HTTP middleware: request ids, timing and security headers

pub mod process_time;
pub mod request_tracking;
pub mod security_headers;

pub use process_time::{process_time_middleware, PROCESS_TIME_HEADER};
pub use request_tracking::{
    request_id_layer, request_id_propagation_layer, sensitive_headers_layer, REQUEST_ID_HEADER,
    SENSITIVE_HEADERS,
};
pub use security_headers::apply_security_headers;
