//! Formatting plugins for azdo-tools.
//!
//! - **Description**: pseudo-markdown to the HTML accepted by `System.Description`
//! - **Split**: one combined `|||`-separated string into per-task descriptions
//! - **Report**: the text returned by each tool (details blocks, summary tables)
//!
//! # Example
//!
//! ```
//! use azdo_formatting::{format_description, split_task_descriptions};
//!
//! let descriptions = split_task_descriptions("Schema ||| API", 2);
//! assert_eq!(format_description(&descriptions[0]), "<p>Schema</p>");
//! ```

pub mod description;
pub mod report;
pub mod split;

pub use description::{format_description, format_optional_description};
pub use report::TaskRow;
pub use split::{split_task_descriptions, split_task_titles, TASK_DELIMITER};
