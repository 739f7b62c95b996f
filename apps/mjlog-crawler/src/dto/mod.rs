//! Request and response bodies

pub mod crawl;
