//! API reference documentation
//!
//! - [`generator`]: renders Markdown reference pages from the type schemas
//! - [`lint`]: checks that links and anchors of reference pages agree

pub mod generator;
pub mod lint;

pub use generator::ReferenceGenerator;
pub use lint::{lint_file, lint_files, lint_reference, LintFinding, LintIssue};
