//! Role/filler tag format.
//!
//! An annotation is the OCR text with every whitespace-delimited word suffixed
//! by `@<TAG>`, where the tag is one of `BR:i`, `IR:i` (role span), `BF:i`,
//! `IF:i` (filler span) or `O`. Role and filler spans are paired by index.
//!
//! [`TagValidator`] checks a model response against that format. It only
//! reports problems; annotations are stored as the model returned them.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// Marker for words outside any role or filler span.
pub const OUTSIDE: &str = "O";

/// One role/filler tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    BeginRole(u32),
    InRole(u32),
    BeginFiller(u32),
    InFiller(u32),
    Outside,
}

impl Tag {
    fn index(&self) -> Option<u32> {
        match *self {
            Tag::BeginRole(i) | Tag::InRole(i) | Tag::BeginFiller(i) | Tag::InFiller(i) => Some(i),
            Tag::Outside => None,
        }
    }

    fn is_role(&self) -> bool {
        matches!(self, Tag::BeginRole(_) | Tag::InRole(_))
    }

    fn is_filler(&self) -> bool {
        matches!(self, Tag::BeginFiller(_) | Tag::InFiller(_))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::BeginRole(i) => write!(f, "BR:{}", i),
            Tag::InRole(i) => write!(f, "IR:{}", i),
            Tag::BeginFiller(i) => write!(f, "BF:{}", i),
            Tag::InFiller(i) => write!(f, "IF:{}", i),
            Tag::Outside => write!(f, "{}", OUTSIDE),
        }
    }
}

/// A word and the tag attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedWord {
    /// Token position in the annotation, counting untagged tokens too.
    pub position: usize,
    pub word: String,
    pub tag: Tag,
}

/// A problem found in an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// Word has no `@` suffix.
    MissingTag { position: usize, token: String },
    /// Suffix is not a known tag.
    UnknownTag { position: usize, tag: String },
    /// `IR:i`/`IF:i` that does not continue a span of the same kind and index.
    BrokenSpan { position: usize, tag: Tag },
    /// Role index with no filler.
    UnpairedRole(u32),
    /// Filler index with no role.
    UnpairedFiller(u32),
    /// Tagged words differ from the source text.
    TextMismatch { expected: usize, found: usize },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingTag { position, token } => {
                write!(f, "word {} '{}' has no tag", position + 1, token)
            }
            Issue::UnknownTag { position, tag } => {
                write!(f, "word {} has unknown tag '{}'", position + 1, tag)
            }
            Issue::BrokenSpan { position, tag } => {
                write!(f, "word {} continues a span that was never begun ({})", position + 1, tag)
            }
            Issue::UnpairedRole(i) => write!(f, "role {} has no co-indexed filler", i),
            Issue::UnpairedFiller(i) => write!(f, "filler {} has no co-indexed role", i),
            Issue::TextMismatch { expected, found } => write!(
                f,
                "tagged text does not match the source ({} source words, {} tagged)",
                expected, found
            ),
        }
    }
}

/// Parser and checker for tagged annotations.
pub struct TagValidator {
    tag_regex: Regex,
}

impl TagValidator {
    pub fn new() -> Self {
        let tag_regex = Regex::new(r"^(?:(BR|IR|BF|IF):([1-9][0-9]*)|O)$").expect("Invalid regex");
        Self { tag_regex }
    }

    /// Parse a single tag such as `BF:2` or `O`.
    pub fn parse_tag(&self, raw: &str) -> Option<Tag> {
        let caps = self.tag_regex.captures(raw)?;
        let (Some(kind), Some(index)) = (caps.get(1), caps.get(2)) else {
            return Some(Tag::Outside);
        };
        let index: u32 = index.as_str().parse().ok()?;

        match kind.as_str() {
            "BR" => Some(Tag::BeginRole(index)),
            "IR" => Some(Tag::InRole(index)),
            "BF" => Some(Tag::BeginFiller(index)),
            "IF" => Some(Tag::InFiller(index)),
            _ => None,
        }
    }

    /// Split an annotation into tagged words, collecting format issues.
    ///
    /// The tag is taken after the last `@`, so words containing `@` survive.
    pub fn parse(&self, annotation: &str) -> (Vec<TaggedWord>, Vec<Issue>) {
        let mut words = Vec::new();
        let mut issues = Vec::new();

        for (position, token) in annotation.split_whitespace().enumerate() {
            let Some((word, raw_tag)) = token.rsplit_once('@') else {
                issues.push(Issue::MissingTag {
                    position,
                    token: token.to_string(),
                });
                continue;
            };

            match self.parse_tag(raw_tag) {
                Some(tag) => words.push(TaggedWord {
                    position,
                    word: word.to_string(),
                    tag,
                }),
                None => issues.push(Issue::UnknownTag {
                    position,
                    tag: raw_tag.to_string(),
                }),
            }
        }

        (words, issues)
    }

    /// Check an annotation, optionally against the text it was produced from.
    pub fn validate(&self, annotation: &str, source: Option<&str>) -> Vec<Issue> {
        let (words, mut issues) = self.parse(annotation);

        let mut previous: Option<&TaggedWord> = None;
        let mut roles = BTreeSet::new();
        let mut fillers = BTreeSet::new();

        for tagged in &words {
            let tag = tagged.tag;
            // A word right after an untagged token was already reported; its
            // span cannot be judged.
            let adjacent = match previous {
                Some(p) => p.position + 1 == tagged.position,
                None => tagged.position == 0,
            };
            let continues = !adjacent
                || match (tag, previous.map(|p| p.tag)) {
                    (Tag::InRole(i), Some(p)) => p.is_role() && p.index() == Some(i),
                    (Tag::InFiller(i), Some(p)) => p.is_filler() && p.index() == Some(i),
                    (Tag::InRole(_) | Tag::InFiller(_), None) => false,
                    _ => true,
                };
            if !continues {
                issues.push(Issue::BrokenSpan {
                    position: tagged.position,
                    tag,
                });
            }

            if let Some(i) = tag.index() {
                if tag.is_role() {
                    roles.insert(i);
                } else {
                    fillers.insert(i);
                }
            }
            previous = Some(tagged);
        }

        issues.extend(roles.difference(&fillers).map(|&i| Issue::UnpairedRole(i)));
        issues.extend(fillers.difference(&roles).map(|&i| Issue::UnpairedFiller(i)));

        if let Some(source) = source {
            let expected: Vec<&str> = source.split_whitespace().collect();
            let found: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
            if expected != found && issues.iter().all(|i| !matches!(i, Issue::MissingTag { .. })) {
                issues.push(Issue::TextMismatch {
                    expected: expected.len(),
                    found: found.len(),
                });
            }
        }

        issues
    }
}

impl Default for TagValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Tag every word of `text` as outside any span.
pub fn tag_all_outside(text: &str) -> String {
    text.split_whitespace()
        .map(|word| format!("{}@{}", word, OUTSIDE))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_all_outside() {
        assert_eq!(tag_all_outside("a b c"), "a@O b@O c@O");
        assert_eq!(tag_all_outside("  CNN\t NEWS \n"), "CNN@O NEWS@O");
        assert_eq!(tag_all_outside(""), "");
    }

    #[test]
    fn test_parse_tag() {
        let validator = TagValidator::new();
        assert_eq!(validator.parse_tag("BR:1"), Some(Tag::BeginRole(1)));
        assert_eq!(validator.parse_tag("IF:12"), Some(Tag::InFiller(12)));
        assert_eq!(validator.parse_tag("O"), Some(Tag::Outside));
        assert_eq!(validator.parse_tag("BR:0"), None);
        assert_eq!(validator.parse_tag("B-PER"), None);
        assert_eq!(Tag::BeginFiller(3).to_string(), "BF:3");
    }

    #[test]
    fn test_valid_credit_annotation() {
        let validator = TagValidator::new();
        let annotation = "John@O Doe@O PRODUCTION@BR:1 ASSISTANT@IR:1 LuAnne@BF:1 Halligan@IF:1 \
                          POST@BR:2 PRODUCTION@IR:2 SUPERVISOR@IR:2 Maggi@BF:2 s66ug@IF:2";
        let source = "John Doe PRODUCTION ASSISTANT LuAnne Halligan POST PRODUCTION SUPERVISOR Maggi s66ug";

        assert!(validator.validate(annotation, Some(source)).is_empty());
    }

    #[test]
    fn test_word_containing_at_sign() {
        let validator = TagValidator::new();
        let (words, issues) = validator.parse("info@pbs.org@O");
        assert!(issues.is_empty());
        assert_eq!(words[0].word, "info@pbs.org");
    }

    #[test]
    fn test_unpaired_spans() {
        let validator = TagValidator::new();
        let issues = validator.validate("Director@BR:1 Stanley@BF:2 Kubrick@IF:2", None);
        assert!(issues.contains(&Issue::UnpairedRole(1)));
        assert!(issues.contains(&Issue::UnpairedFiller(2)));
    }

    #[test]
    fn test_broken_span() {
        let validator = TagValidator::new();
        let issues = validator.validate("Stanley@BF:1 Kubrick@IR:1 Director@BR:1", None);
        assert_eq!(
            issues,
            vec![Issue::BrokenSpan {
                position: 1,
                tag: Tag::InRole(1)
            }]
        );
    }

    #[test]
    fn test_broken_span_reports_annotation_position() {
        let validator = TagValidator::new();
        let issues = validator.validate("Stanley@BF:1 Kubrick Director@IF:1 Writer@BR:1 Page@IR:2", None);
        assert_eq!(
            issues,
            vec![
                Issue::MissingTag {
                    position: 1,
                    token: "Kubrick".to_string()
                },
                Issue::BrokenSpan {
                    position: 4,
                    tag: Tag::InRole(2)
                },
                Issue::UnpairedRole(2),
            ]
        );
    }

    #[test]
    fn test_dropped_words_are_a_mismatch() {
        let validator = TagValidator::new();
        let issues = validator.validate(
            "Stanley@BF:1 Kubrick@IF:1 Director@BR:1",
            Some("Stanley Kubrick Writer Director of The Shining"),
        );
        assert_eq!(
            issues,
            vec![Issue::TextMismatch {
                expected: 7,
                found: 3
            }]
        );
    }

    #[test]
    fn test_missing_and_unknown_tags() {
        let validator = TagValidator::new();
        let issues = validator.validate("CLARENCE PAGE@B-PER", None);
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], Issue::MissingTag { position: 0, .. }));
        assert!(matches!(issues[1], Issue::UnknownTag { position: 1, .. }));
    }
}
