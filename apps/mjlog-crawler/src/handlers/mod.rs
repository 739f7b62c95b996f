//! HTTP handlers

pub mod crawl;
