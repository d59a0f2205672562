//! Error types for xray-gherkin operations.

use std::io;
use thiserror::Error;

/// The error type for feature file parsing and reference extraction.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading a feature file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The document does not follow the Gherkin structure.
    #[error("line {line}: {message}")]
    Syntax {
        /// The 1-based line number where parsing failed.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// The document has no `Feature:` keyword.
    #[error("No Feature keyword found in document")]
    MissingFeature,

    /// The project key cannot be used to build issue key patterns.
    #[error("Invalid project key '{0}': expected an uppercase letter followed by uppercase letters, digits or underscores")]
    InvalidProjectKey(String),

    /// A scenario carries no test issue tag.
    #[error("No test issue keys found in tags of scenario \"{scenario}\" (line {line})\n\n{hint}")]
    MissingTestTag {
        /// The scenario name.
        scenario: String,
        /// The line of the scenario keyword.
        line: usize,
        /// How to tag the scenario correctly.
        hint: String,
    },

    /// A scenario carries more than one test issue tag.
    #[error("Multiple test issue keys found in tags of scenario \"{scenario}\" (line {line}): {}\n\nOnly one test issue can be linked to a scenario. Remove all but one of the tags.", .keys.join(", "))]
    MultipleTestTags {
        /// The scenario name.
        scenario: String,
        /// The line of the scenario keyword.
        line: usize,
        /// Every issue key found in the tags.
        keys: Vec<String>,
    },

    /// A background with steps carries no precondition comment.
    #[error("No precondition issue keys found in comments of background \"{background}\" (line {line})\n\n{hint}")]
    MissingPreconditionComment {
        /// The background name.
        background: String,
        /// The line of the background keyword.
        line: usize,
        /// How to annotate the background correctly.
        hint: String,
    },

    /// A background carries more than one precondition comment.
    #[error("Multiple precondition issue keys found in comments of background \"{background}\" (line {line}): {}\n\nRemove all but one of the comments.", .keys.join(", "))]
    MultiplePreconditionComments {
        /// The background name.
        background: String,
        /// The line of the background keyword.
        line: usize,
        /// Every issue key found in the comments.
        keys: Vec<String>,
    },
}

/// A specialized Result type for xray-gherkin operations.
pub type Result<T> = std::result::Result<T, Error>;
