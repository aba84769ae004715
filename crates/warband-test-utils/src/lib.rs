//! Test utilities and mock collaborators for Warband development.
//!
//! [`fixtures`] builds small, fully known scenarios; [`mocks`] provides
//! event hooks and user choices that record what the engine asked of them.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod mocks;

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
