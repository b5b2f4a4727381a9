//! Control API: start, stop and inspect runs over plain HTTP/1.1.
mod http;
mod server;
mod types;


pub use http::{
    HttpRequest, MAX_REQUEST_BYTES, read_http_request, status_text, write_error_response,
    write_json_response,
};
pub use server::{bind_control_listener, handle_control_connection, route, serve_control};
pub use types::{ControlReply, ControlResponse, StartRequest};
