//! Integration tests driving both phases against wiremock servers

mod common;
mod crawl_tests;
mod index_tests;
