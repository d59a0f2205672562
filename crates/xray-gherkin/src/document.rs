//! Light Gherkin document model.
//!
//! Only the parts of a feature file that matter for issue linking are kept:
//! the feature and scenario names, tags, and the comments and step counts of
//! backgrounds. Steps, tables and doc strings are skipped. Only the English
//! keyword set is recognized.

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

const STEP_KEYWORDS: [&str; 6] = ["Given ", "When ", "Then ", "And ", "But ", "* "];

/// A tag attached to a feature or scenario, including its `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// The tag text, e.g. `@smoke`.
    pub name: String,
    /// The 1-based line the tag appears on.
    pub line: usize,
}

/// A comment line, with the leading `#` removed and whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// The comment text.
    pub text: String,
    /// The 1-based line the comment appears on.
    pub line: usize,
}

/// The flavor of a scenario keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// `Scenario:` or `Example:`
    Scenario,
    /// `Scenario Outline:` or `Scenario Template:`
    Outline,
}

/// A scenario or scenario outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Which keyword introduced the scenario.
    pub kind: ScenarioKind,
    /// The scenario name.
    pub name: String,
    /// The 1-based line of the keyword.
    pub line: usize,
    /// Tags directly preceding the scenario.
    pub tags: Vec<Tag>,
}

/// A background block, either at feature level or inside a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    /// The background name (often empty).
    pub name: String,
    /// The 1-based line of the keyword.
    pub line: usize,
    /// Comments between the keyword and the last step.
    pub comments: Vec<Comment>,
    /// Number of steps in the background.
    pub step_count: usize,
}

/// A parsed feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDocument {
    /// The feature name.
    pub name: String,
    /// Tags preceding the feature keyword.
    pub tags: Vec<Tag>,
    /// Backgrounds in document order.
    pub backgrounds: Vec<Background>,
    /// Scenarios in document order, including those nested in rules.
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Feature,
    Rule,
    Background,
    Scenario,
    Outline,
    Examples,
}

// Longer keywords come first so that "Scenario Outline:" wins over "Scenario:".
const KEYWORDS: [(&str, Keyword); 9] = [
    ("Feature:", Keyword::Feature),
    ("Rule:", Keyword::Rule),
    ("Background:", Keyword::Background),
    ("Scenario Outline:", Keyword::Outline),
    ("Scenario Template:", Keyword::Outline),
    ("Scenario:", Keyword::Scenario),
    ("Example:", Keyword::Scenario),
    ("Examples:", Keyword::Examples),
    ("Scenarios:", Keyword::Examples),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Feature,
    Background,
    Scenario,
    Examples,
}

/// Read and parse a feature file.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read, or a parse error from
/// [`parse_feature`].
pub async fn read_feature_file(path: &Path) -> Result<FeatureDocument> {
    debug!(path = %path.display(), "Reading feature file");
    let text = tokio::fs::read_to_string(path).await?;
    parse_feature(&text)
}

/// Parse the text of a feature file.
///
/// # Errors
///
/// - `Error::MissingFeature` if there is no `Feature:` keyword
/// - `Error::Syntax` for malformed tag lines, unsupported languages, misplaced
///   keywords, unterminated doc strings or tags that precede nothing
pub fn parse_feature(text: &str) -> Result<FeatureDocument> {
    let mut feature: Option<FeatureDocument> = None;
    let mut section = Section::Preamble;
    let mut pending_tags: Vec<Tag> = Vec::new();
    let mut doc_string: Option<(&str, usize)> = None;
    // Background comments after a step, kept only if another step follows.
    let mut trailing_comments: Vec<Comment> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();

        if let Some((delimiter, _)) = doc_string {
            if line.starts_with(delimiter) {
                doc_string = None;
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if section == Section::Preamble {
                check_language(comment, line_number)?;
            }
            if section == Section::Background {
                if let Some(background) = feature.as_mut().and_then(|f| f.backgrounds.last_mut()) {
                    let comment = Comment {
                        text: comment.to_string(),
                        line: line_number,
                    };
                    if background.step_count == 0 {
                        background.comments.push(comment);
                    } else {
                        trailing_comments.push(comment);
                    }
                }
            }
            continue;
        }

        if line.starts_with("\"\"\"") {
            doc_string = Some(("\"\"\"", line_number));
            continue;
        }
        if line.starts_with("```") {
            doc_string = Some(("```", line_number));
            continue;
        }

        if line.starts_with('@') {
            pending_tags.extend(parse_tag_line(line, line_number)?);
            continue;
        }

        if let Some((keyword, name)) = match_keyword(line) {
            trailing_comments.clear();
            if keyword == Keyword::Feature {
                if feature.is_some() {
                    return Err(syntax(line_number, "a document may only contain one Feature"));
                }
                feature = Some(FeatureDocument {
                    name: name.to_string(),
                    tags: std::mem::take(&mut pending_tags),
                    backgrounds: Vec::new(),
                    scenarios: Vec::new(),
                });
                section = Section::Feature;
                continue;
            }

            let Some(document) = feature.as_mut() else {
                return Err(syntax(line_number, "keyword found before the Feature keyword"));
            };

            match keyword {
                Keyword::Feature => unreachable!("handled above"),
                Keyword::Rule => {
                    // Rule tags are not linked to issues.
                    pending_tags.clear();
                    section = Section::Feature;
                }
                Keyword::Background => {
                    if !pending_tags.is_empty() {
                        return Err(syntax(line_number, "tags are not allowed on a Background"));
                    }
                    document.backgrounds.push(Background {
                        name: name.to_string(),
                        line: line_number,
                        comments: Vec::new(),
                        step_count: 0,
                    });
                    section = Section::Background;
                }
                Keyword::Scenario | Keyword::Outline => {
                    let kind = if keyword == Keyword::Outline {
                        ScenarioKind::Outline
                    } else {
                        ScenarioKind::Scenario
                    };
                    document.scenarios.push(Scenario {
                        kind,
                        name: name.to_string(),
                        line: line_number,
                        tags: std::mem::take(&mut pending_tags),
                    });
                    section = Section::Scenario;
                }
                Keyword::Examples => {
                    if section != Section::Scenario && section != Section::Examples {
                        return Err(syntax(line_number, "Examples must belong to a Scenario Outline"));
                    }
                    pending_tags.clear();
                    section = Section::Examples;
                }
            }
            continue;
        }

        if !pending_tags.is_empty() {
            return Err(syntax(
                pending_tags[0].line,
                "tags must be followed by a Feature, Rule or Scenario keyword",
            ));
        }

        if section == Section::Background && is_step(line) {
            if let Some(background) = feature.as_mut().and_then(|f| f.backgrounds.last_mut()) {
                background.comments.append(&mut trailing_comments);
                background.step_count += 1;
            }
        }
    }

    if let Some((_, line)) = doc_string {
        return Err(syntax(line, "doc string is never closed"));
    }
    if let Some(tag) = pending_tags.first() {
        return Err(syntax(tag.line, "tags at the end of the document precede nothing"));
    }

    feature.ok_or(Error::MissingFeature)
}

fn syntax(line: usize, message: &str) -> Error {
    Error::Syntax {
        line,
        message: message.to_string(),
    }
}

fn check_language(comment: &str, line: usize) -> Result<()> {
    if let Some(language) = comment.strip_prefix("language:") {
        let language = language.trim();
        if language != "en" {
            return Err(Error::Syntax {
                line,
                message: format!("unsupported Gherkin language '{language}', only 'en' is supported"),
            });
        }
    }
    Ok(())
}

fn match_keyword(line: &str) -> Option<(Keyword, &str)> {
    KEYWORDS.iter().find_map(|(prefix, keyword)| {
        line.strip_prefix(prefix)
            .map(|rest| (*keyword, rest.trim()))
    })
}

fn is_step(line: &str) -> bool {
    STEP_KEYWORDS.iter().any(|keyword| line.starts_with(keyword))
}

fn parse_tag_line(line: &str, line_number: usize) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    for token in line.split_whitespace() {
        if token.starts_with('#') {
            break;
        }
        if token.len() < 2 || !token.starts_with('@') {
            return Err(Error::Syntax {
                line: line_number,
                message: format!("expected a tag starting with '@' but found '{token}'"),
            });
        }
        tags.push(Tag {
            name: token.to_string(),
            line: line_number,
        });
    }
    Ok(tags)
}
