//! Courses and specializations excluded from processing.
//!
//! Entries are exact slugs or glob patterns (`machine-learning-*`).

use std::collections::BTreeSet;

use glob::Pattern;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    courses: BTreeSet<String>,
    specializations: BTreeSet<String>,
}

impl SkipList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add course entries; whitespace is trimmed and empty entries dropped
    pub fn add_courses<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_trimmed(&mut self.courses, entries);
    }

    /// Add specialization entries; whitespace is trimmed and empty entries dropped
    pub fn add_specializations<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_trimmed(&mut self.specializations, entries);
    }

    pub fn skips_course(&self, slug: &str) -> bool {
        matches_any(&self.courses, slug)
    }

    pub fn skips_specialization(&self, slug: &str) -> bool {
        matches_any(&self.specializations, slug)
    }

    pub fn courses(&self) -> impl Iterator<Item = &str> {
        self.courses.iter().map(String::as_str)
    }

    pub fn specializations(&self) -> impl Iterator<Item = &str> {
        self.specializations.iter().map(String::as_str)
    }
}

fn extend_trimmed<I, S>(set: &mut BTreeSet<String>, entries: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    set.extend(
        entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty()),
    );
}

fn matches_any(entries: &BTreeSet<String>, slug: &str) -> bool {
    entries.iter().any(|entry| {
        entry == slug
            || Pattern::new(entry)
                .map(|pattern| pattern.matches(slug))
                .unwrap_or(false)
    })
}
