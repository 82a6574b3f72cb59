// Ant-style patterns for Path and Host predicates
//
//   ?        one character within a segment
//   *        zero or more characters within a segment
//   **       zero or more whole segments
//   {name}   one segment, captured as `name`
//   {*name}  the remaining segments, captured as `name` (last segment only)

use std::collections::BTreeMap;

use regex::Regex;

/// Ant-style pattern compiled to one anchored regex.
///
/// Text is normalized before matching: empty segments are dropped and each
/// remaining segment is prefixed with the separator, so `/foo//bar/` and
/// `foo/bar` both become `/foo/bar`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    separator: char,
    /// `None` when the pattern can never match (`{*name}` before the end)
    regex: Option<Regex>,
    /// Capture group names, in group order
    variables: Vec<String>,
}

pub type PathVariables = BTreeMap<String, String>;

impl PathPattern {
    /// Pattern over `/`-separated request paths
    pub fn path(raw: &str) -> Self {
        Self::with_separator(raw, '/')
    }

    /// Pattern over `.`-separated host names, matched case-insensitively
    pub fn host(raw: &str) -> Self {
        Self::with_separator(&raw.to_ascii_lowercase(), '.')
    }

    fn with_separator(raw: &str, separator: char) -> Self {
        let sep = regex::escape(&separator.to_string());
        let segment = format!("[^{}]", sep);
        let segments: Vec<&str> = raw.split(separator).filter(|s| !s.is_empty()).collect();

        let mut variables = Vec::new();
        let mut source = String::from("^");
        let mut valid = true;

        for (idx, s) in segments.iter().enumerate() {
            if *s == "**" {
                source.push_str(&format!("(?:{}{}+)*", sep, segment));
            } else if let Some(name) = s.strip_prefix("{*").and_then(|r| r.strip_suffix('}')) {
                if idx + 1 != segments.len() {
                    valid = false;
                    break;
                }
                variables.push(name.to_string());
                source.push_str(&format!("((?:{}{}+)*)", sep, segment));
            } else if let Some(name) = s.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
                variables.push(name.to_string());
                source.push_str(&format!("{}({}+)", sep, segment));
            } else {
                source.push_str(&sep);
                for c in s.chars() {
                    match c {
                        '*' => source.push_str(&format!("{}*", segment)),
                        '?' => source.push_str(&segment),
                        c => source.push_str(&regex::escape(&c.to_string())),
                    }
                }
            }
        }
        source.push('$');

        let regex = if valid {
            Regex::new(&source)
                .map_err(|e| tracing::warn!("Pattern '{}' did not compile: {}", raw, e))
                .ok()
        } else {
            tracing::warn!("Pattern '{}' has a rest capture before its last segment", raw);
            None
        };

        Self {
            raw: raw.to_string(),
            separator,
            regex,
            variables,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(&self.normalize(text)))
    }

    /// Match `text`, returning captured variables on success
    pub fn captures(&self, text: &str) -> Option<PathVariables> {
        let normalized = self.normalize(text);
        let caps = self.regex.as_ref()?.captures(&normalized)?;

        let mut vars = PathVariables::new();
        for (idx, name) in self.variables.iter().enumerate() {
            let value = caps.get(idx + 1).map_or("", |m| m.as_str());
            // An empty rest capture still reports the root
            let value = if value.is_empty() { self.separator.to_string() } else { value.to_string() };
            vars.insert(name.clone(), value);
        }
        Some(vars)
    }

    fn normalize(&self, text: &str) -> String {
        let text = if self.separator == '.' {
            text.to_ascii_lowercase()
        } else {
            text.to_string()
        };
        text.split(self.separator)
            .filter(|s| !s.is_empty())
            .fold(String::with_capacity(text.len() + 1), |mut out, part| {
                out.push(self.separator);
                out.push_str(part);
                out
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_star_matches_any_depth() {
        let p = PathPattern::path("/foo/**");
        assert!(p.is_match("/foo"));
        assert!(p.is_match("/foo/"));
        assert!(p.is_match("/foo/bar/baz"));
        assert!(!p.is_match("/foobar"));
        assert!(!p.is_match("/bar/foo"));
    }

    #[test]
    fn single_star_and_question_mark_stay_in_segment() {
        let p = PathPattern::path("/api/*/item?");
        assert!(p.is_match("/api/v1/item1"));
        assert!(!p.is_match("/api/v1/v2/item1"));
        assert!(!p.is_match("/api/v1/item12"));

        let p = PathPattern::path("/files/*.json");
        assert!(p.is_match("/files/routes.json"));
        assert!(!p.is_match("/files/routes.yaml"));
    }

    #[test]
    fn double_star_in_the_middle() {
        let p = PathPattern::path("/a/**/z");
        assert!(p.is_match("/a/z"));
        assert!(p.is_match("/a/b/c/z"));
        assert!(!p.is_match("/a/b/c"));
    }

    #[test]
    fn captures_variables() {
        let p = PathPattern::path("/user/{id}/menu/{*rest}");
        let vars = p.captures("/user/42/menu/tree/7").unwrap();
        assert_eq!(vars["id"], "42");
        assert_eq!(vars["rest"], "/tree/7");

        let vars = p.captures("/user/42/menu").unwrap();
        assert_eq!(vars["rest"], "/");
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let p = PathPattern::path("/v1.0/(docs)+");
        assert!(p.is_match("/v1.0/(docs)+"));
        assert!(!p.is_match("/v1x0/docsdocs"));
    }

    #[test]
    fn rest_capture_must_be_last() {
        let p = PathPattern::path("/{*rest}/tail");
        assert!(!p.is_match("/a/tail"));
        assert!(!p.is_match("/tail"));
    }

    #[test]
    fn empty_segments_are_ignored() {
        let p = PathPattern::path("/foo/{id}");
        assert_eq!(p.captures("//foo//9/").unwrap()["id"], "9");
        assert!(PathPattern::path("/").is_match("/"));
    }

    #[test]
    fn host_patterns_ignore_case() {
        let p = PathPattern::host("**.example.org");
        assert!(p.is_match("api.EXAMPLE.org"));
        assert!(p.is_match("a.b.example.org"));
        assert!(!p.is_match("example.com"));
    }
}
