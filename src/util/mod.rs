//! Utility functions for common operations.
//!
//! - **URL validation**: accepting bookmark URLs and re-checking them before
//!   they are opened
//! - **Text processing**: Unicode-aware width calculation, truncation, and
//!   stripping of terminal control sequences
//!
//! # Examples
//!
//! ```
//! use smartmarks::util::{bookmark_domain, truncate_to_width, validate_bookmark_url};
//!
//! let url = validate_bookmark_url("https://rust-lang.org/learn").unwrap();
//! assert_eq!(bookmark_domain(url.as_str()).as_deref(), Some("rust-lang.org"));
//! assert_eq!(truncate_to_width("Long bookmark title", 10), "Long bo...");
//! ```

mod text;
mod url_validator;

pub use text::{display_width, strip_control_chars, truncate_to_width};
pub use url_validator::{
    bookmark_domain, validate_bookmark_url, validate_url_for_open, UrlValidationError,
};

/// Maximum allowed search query length, enforced by the search input.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;

/// Maximum title length accepted by the add form.
pub const MAX_TITLE_LENGTH: usize = 512;
