#![allow(clippy::empty_line_after_doc_comments)]
#![allow(clippy::doc_lazy_continuation)]
// src/lib.rs

// Authentication module
pub mod auth;

// HTTP server
pub mod server;
