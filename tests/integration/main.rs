//! Integration tests against local catalog and stream servers

mod catalog_test;
mod config_test;
mod stream_test;
