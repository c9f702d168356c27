// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path policy: which request paths are public, secured, or not governed.
//!
//! Patterns use Ant-style globs: `*` matches within one path segment,
//! `**` matches any number of segments, and `/prefix/**` also matches
//! `/prefix` itself.

use glob::{MatchOptions, Pattern, PatternError};

pub const DEFAULT_SECURED_PATH_PATTERNS: &[&str] = &["/api/**"];

pub const DEFAULT_PERMITTED_PATH_PATTERNS: &[&str] = &[
    "/actuator/**",
    "/swagger-ui/**",
    "/swagger-ui.html",
    "/v3/api-docs/**",
    "/error",
];

pub const DEFAULT_MATCHED_PATH_PATTERNS: &[&str] = &["/**"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Classification of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Always public; no authentication attempted.
    Public,
    /// Requires a valid principal; failure is terminal.
    Secured,
    /// Not governed here; passed through unauthenticated.
    Unmatched,
}

/// Configured pattern lists.
///
/// A `Some` base list replaces the built-in default; the `additional_*`
/// lists are appended to whichever base is in effect.
#[derive(Debug, Clone, Default)]
pub struct PathPolicyConfig {
    pub secured_path_patterns: Option<Vec<String>>,
    pub additional_secured_path_patterns: Vec<String>,
    pub permitted_path_patterns: Option<Vec<String>>,
    pub additional_permitted_path_patterns: Vec<String>,
    pub matched_path_patterns: Option<Vec<String>>,
    pub additional_matched_path_patterns: Vec<String>,
}

impl PathPolicyConfig {
    pub fn combined_secured_path_patterns(&self) -> Vec<String> {
        combine(
            self.secured_path_patterns.as_deref(),
            DEFAULT_SECURED_PATH_PATTERNS,
            &self.additional_secured_path_patterns,
        )
    }

    pub fn combined_permitted_path_patterns(&self) -> Vec<String> {
        combine(
            self.permitted_path_patterns.as_deref(),
            DEFAULT_PERMITTED_PATH_PATTERNS,
            &self.additional_permitted_path_patterns,
        )
    }

    pub fn combined_matched_path_patterns(&self) -> Vec<String> {
        combine(
            self.matched_path_patterns.as_deref(),
            DEFAULT_MATCHED_PATH_PATTERNS,
            &self.additional_matched_path_patterns,
        )
    }
}

/// Base patterns first, then additions; duplicates dropped.
fn combine(base: Option<&[String]>, defaults: &[&str], additional: &[String]) -> Vec<String> {
    let base: Vec<String> = match base {
        Some(patterns) => patterns.to_vec(),
        None => defaults.iter().map(|p| p.to_string()).collect(),
    };

    let mut combined: Vec<String> = Vec::with_capacity(base.len() + additional.len());
    for pattern in base.into_iter().chain(additional.iter().cloned()) {
        if !combined.contains(&pattern) {
            combined.push(pattern);
        }
    }
    combined
}

/// A single compiled Ant-style pattern.
#[derive(Debug, Clone)]
struct PathPattern {
    pattern: Pattern,
    /// For `/x/**`, the bare `/x` also matches.
    recursive_root: Option<String>,
}

impl PathPattern {
    fn new(raw: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::new(raw)?,
            recursive_root: raw.strip_suffix("/**").map(str::to_string),
        })
    }

    fn matches(&self, path: &str) -> bool {
        if let Some(root) = &self.recursive_root {
            if path == root || path.strip_prefix(root.as_str()) == Some("/") {
                return true;
            }
        }
        self.pattern.matches_with(path, MATCH_OPTIONS)
    }
}

#[derive(Debug, Clone, Default)]
struct PatternSet {
    patterns: Vec<PathPattern>,
}

impl PatternSet {
    fn compile(raw: &[String]) -> Result<Self, PatternError> {
        let patterns = raw
            .iter()
            .map(|p| PathPattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Compiled path policy. Read-only after construction.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    secured: PatternSet,
    permitted: PatternSet,
    matched: PatternSet,
}

impl PathPolicy {
    pub fn from_config(config: &PathPolicyConfig) -> Result<Self, PatternError> {
        Ok(Self {
            secured: PatternSet::compile(&config.combined_secured_path_patterns())?,
            permitted: PatternSet::compile(&config.combined_permitted_path_patterns())?,
            matched: PatternSet::compile(&config.combined_matched_path_patterns())?,
        })
    }

    /// Classify a request path.
    ///
    /// Permitted patterns win over secured ones; paths outside the matched
    /// set are never secured.
    pub fn classify(&self, path: &str) -> PathClass {
        if self.permitted.matches(path) {
            PathClass::Public
        } else if !self.matched.matches(path) {
            PathClass::Unmatched
        } else if self.secured.matches(path) {
            PathClass::Secured
        } else {
            PathClass::Unmatched
        }
    }
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::from_config(&PathPolicyConfig::default())
            .expect("default path patterns are valid globs")
    }
}
