//! Route pattern compilation.
//!
//! # Grammar
//! ```text
//! /users/:id             named       one segment, bound to `id`
//! /re/{year:[12]\d{3}}   regex       one segment matching the whole regex
//! /files/*filepath       wildcard    one or more trailing segments
//! /about                 static      exact text
//! ```
//!
//! # Design Decisions
//! - Empty tokens are discarded, so `/a//b/` compiles like `/a/b`
//! - Regexes are anchored on both ends; `/` cannot appear inside them
//! - Duplicate parameter names are rejected here, before insertion

use std::collections::HashSet;

use regex::Regex;

use crate::routing::error::PatternError;

/// One compiled unit of a route pattern.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal text.
    Static(String),
    /// `:name`
    Named(String),
    /// `{name:regex}`; `source` keeps the text as written.
    Regex {
        name: String,
        source: String,
        regex: Regex,
    },
    /// `*name`
    Wildcard(String),
}

impl Segment {
    /// Parameter name bound by this segment, if it is dynamic.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Static(_) => None,
            Segment::Named(name) | Segment::Wildcard(name) => Some(name),
            Segment::Regex { name, .. } => Some(name),
        }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Segment::Static(a), Segment::Static(b)) => a == b,
            (Segment::Named(a), Segment::Named(b)) => a == b,
            (Segment::Wildcard(a), Segment::Wildcard(b)) => a == b,
            (
                Segment::Regex { name: a, source: sa, .. },
                Segment::Regex { name: b, source: sb, .. },
            ) => a == b && sa == sb,
            _ => false,
        }
    }
}

/// Split a request path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Compile a route pattern into its ordered segments.
pub fn compile(pattern: &str) -> Result<Vec<Segment>, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    let tokens = split_path(pattern);
    let mut segments = Vec::with_capacity(tokens.len());
    let mut seen = HashSet::new();

    for (i, token) in tokens.iter().enumerate() {
        let segment = parse_segment(pattern, token)?;

        if let Segment::Wildcard(name) = &segment {
            if i + 1 != tokens.len() {
                return Err(PatternError::WildcardNotLast {
                    pattern: pattern.to_string(),
                    name: name.clone(),
                });
            }
        }

        if let Some(name) = segment.param_name() {
            if !seen.insert(name.to_string()) {
                return Err(PatternError::DuplicateName {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
        }

        segments.push(segment);
    }

    Ok(segments)
}

fn parse_segment(pattern: &str, token: &str) -> Result<Segment, PatternError> {
    let named = |name: &str| {
        if name.is_empty() {
            Err(PatternError::EmptyName {
                pattern: pattern.to_string(),
            })
        } else {
            Ok(name.to_string())
        }
    };

    if let Some(name) = token.strip_prefix(':') {
        return named(name).map(Segment::Named);
    }
    if let Some(name) = token.strip_prefix('*') {
        return named(name).map(Segment::Wildcard);
    }
    if token.starts_with('{') {
        let malformed = || PatternError::MalformedRegexSegment {
            pattern: pattern.to_string(),
            segment: token.to_string(),
        };
        let inner = token
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .ok_or_else(malformed)?;
        let (name, source) = inner.split_once(':').ok_or_else(malformed)?;
        if source.is_empty() {
            return Err(malformed());
        }
        let name = named(name)?;
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|err| {
            PatternError::InvalidRegex {
                pattern: pattern.to_string(),
                name: name.clone(),
                source: err,
            }
        })?;
        return Ok(Segment::Regex {
            name,
            source: source.to_string(),
            regex,
        });
    }

    Ok(Segment::Static(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_segments() {
        let segments = compile("/api/:id/{n:\\d+}/*rest").unwrap();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], Segment::Static("api".into()));
        assert_eq!(segments[1], Segment::Named("id".into()));
        assert!(matches!(&segments[2], Segment::Regex { name, source, .. } if name == "n" && source == "\\d+"));
        assert_eq!(segments[3], Segment::Wildcard("rest".into()));
    }

    #[test]
    fn root_has_no_segments() {
        assert!(compile("/").unwrap().is_empty());
        assert_eq!(compile("//a///b/").unwrap().len(), 2);
    }

    #[test]
    fn regex_is_anchored() {
        let segments = compile("/{n:\\d+}").unwrap();
        let Segment::Regex { regex, .. } = &segments[0] else {
            panic!("expected regex segment");
        };
        assert!(regex.is_match("123"));
        assert!(!regex.is_match("12a"));
        assert!(!regex.is_match("a12"));
    }

    #[test]
    fn regex_with_braces_in_body() {
        let segments = compile("/{year:[12][0-9]{3}}").unwrap();
        assert!(matches!(&segments[0], Segment::Regex { source, .. } if source == "[12][0-9]{3}"));
    }

    #[test]
    fn rejects_empty_pattern() {
        assert!(matches!(compile(""), Err(PatternError::Empty)));
    }

    #[test]
    fn rejects_wildcard_before_end() {
        assert!(matches!(
            compile("/files/*rest/more"),
            Err(PatternError::WildcardNotLast { .. })
        ));
    }

    #[test]
    fn rejects_bad_regex() {
        assert!(matches!(
            compile("/{id:[a-z}"),
            Err(PatternError::InvalidRegex { .. })
        ));
        assert!(matches!(
            compile("/{id}"),
            Err(PatternError::MalformedRegexSegment { .. })
        ));
        assert!(matches!(
            compile("/{id:\\d+"),
            Err(PatternError::MalformedRegexSegment { .. })
        ));
    }

    #[test]
    fn rejects_unnamed_and_duplicate_params() {
        assert!(matches!(compile("/users/:"), Err(PatternError::EmptyName { .. })));
        assert!(matches!(compile("/{:\\d+}"), Err(PatternError::EmptyName { .. })));
        assert!(matches!(
            compile("/:id/x/{id:\\d+}"),
            Err(PatternError::DuplicateName { name, .. }) if name == "id"
        ));
    }
}
