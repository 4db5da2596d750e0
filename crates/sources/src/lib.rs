//! Fetching modules from git repositories, folders and tarballs.

pub mod archive;
pub mod detect;
pub mod error;
pub mod fetch;

pub use {
    detect::{derive_name, detect_type},
    error::{Error, Result},
    fetch::{add_module, fetch, fetch_kind, update_module},
};
