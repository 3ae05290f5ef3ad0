//! Common test infrastructure
//!
//! Builds a throwaway data directory shaped like the output of the upstream
//! fetchers. Tests should only import from this module, not from internal
//! submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{create_test_data_dir, BEATLES_QID};
//!
//! #[test]
//! fn test_something() {
//!     let (_dir, data_dir) = create_test_data_dir().unwrap();
//!     assert!(data_dir.join("artist_index.jsonl").exists());
//! }
//! ```

mod constants;
mod fixtures;

// Public API - this is what tests import
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{cli_config, create_test_data_dir, make_article};
