//! HTTP integration tests, driving the full router over a real socket.

mod roster_http_test;
mod stats_http_test;
mod support;
