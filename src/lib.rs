//! perfdigest - Summaries of performance-regression notifications
//!
//! Reads notification e-mails from an mbox file, resolves the changeset
//! range each one reports, and merges the ranges of every test into a
//! sorted, non-overlapping timeline annotated with per-platform changes.
//! The timeline is rendered as an HTML table, plain text or JSON.

pub mod cli;
pub mod config;
pub mod digest;
pub mod html_output;
pub mod json_output;
pub mod notification;
pub mod resolver;
pub mod timeline;
