//! Integration tests for dirscrape
//!
//! These tests use wiremock to stand in for the directory site and run the
//! full pipeline end-to-end against temporary data and cache folders.

mod pipeline_tests;
