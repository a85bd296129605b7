//! Turns free-text timetable cells into subject names.
//!
//! Extraction is driven by [RULES], an ordered table of matcher/resolver pairs. The first rule
//! whose matcher accepts the cell decides the outcome. Cells shared by two sub-groups
//! (`"CN Lab (DT105) (B1&B3) / DAA Lab (DT111) (B2&B4)"`) are split first and only the branch
//! belonging to the caller's batch is extracted.

use std::collections::BTreeSet;

use super::Timetable;

/// Batches offered when the timetable has no partitioned cells to detect them from.
pub const DEFAULT_BATCHES: [&str; 2] = ["B1/B3", "B2/B4"];

/// Prefix of room codes such as `DT105`. Lab names are cut at it.
const ROOM_CODE_MARKER: &str = "DT";

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Blank,
    Contains(&'static str),
    Exactly(&'static [&'static str]),
    Any,
}

impl Matcher {
    fn matches(&self, cell: &str) -> bool {
        match self {
            Matcher::Blank => cell.is_empty(),
            Matcher::Contains(needle) => cell.contains(needle),
            Matcher::Exactly(values) => values.contains(&cell),
            Matcher::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Resolver {
    NoClass,
    Named(&'static str),
    /// `<course code>-<name> (<room>)`.
    CourseCode,
    Verbatim,
}

impl Resolver {
    fn resolve(&self, cell: &str) -> Option<String> {
        match self {
            Resolver::NoClass => None,
            Resolver::Named(name) => Some(name.to_string()),
            Resolver::CourseCode => {
                let segment = cell.split('-').nth(1)?;
                let mut subject = segment.split('(').next().unwrap_or_default().trim();
                if subject.contains("Lab") {
                    subject = subject
                        .split(ROOM_CODE_MARKER)
                        .next()
                        .unwrap_or_default()
                        .trim();
                }
                Some(subject.to_string()).filter(|v| !v.is_empty())
            }
            Resolver::Verbatim => Some(cell.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    matcher: Matcher,
    resolver: Resolver,
}

const fn rule(matcher: Matcher, resolver: Resolver) -> Rule {
    Rule { matcher, resolver }
}

const RULES: &[Rule] = &[
    rule(Matcher::Blank, Resolver::NoClass),
    rule(Matcher::Contains("Lunch"), Resolver::NoClass),
    rule(Matcher::Exactly(&["Minor", "OE"]), Resolver::NoClass),
    rule(Matcher::Contains("Mentor-Mentee"), Resolver::NoClass),
    rule(Matcher::Exactly(&["MDM"]), Resolver::Named("MDM")),
    rule(Matcher::Contains("HONORS"), Resolver::Named("HONORS")),
    rule(
        Matcher::Contains("Technical Skill"),
        Resolver::Named("Technical Skill"),
    ),
    rule(Matcher::Contains("-"), Resolver::CourseCode),
    rule(Matcher::Any, Resolver::Verbatim),
];

/// Canonical subject for a single cell, or [None] if the slot holds no class.
pub fn extract_subject(cell: &str) -> Option<String> {
    let cell = cell.trim();
    RULES
        .iter()
        .find(|rule| rule.matcher.matches(cell))
        .and_then(|rule| rule.resolver.resolve(cell))
}

/// Subject a batch attends in the given cell. Partitioned cells resolve to the branch marked with
/// the batch, or to nothing when no branch belongs to it.
pub fn subject_for_batch(cell: &str, batch: &str) -> Option<String> {
    let subject = extract_subject(cell)?;
    if !is_partitioned(cell) {
        return Some(subject);
    }

    cell.split('/')
        .find(|branch| group_markers(branch).any(|marker| batch_matches(batch, marker)))
        .and_then(|branch| extract_subject(branch.split('(').next().unwrap_or_default()))
}

/// A cell is partitioned when it lists parallel sessions for different groups.
fn is_partitioned(cell: &str) -> bool {
    cell.contains('/') && cell.split('/').any(|branch| group_markers(branch).next().is_some())
}

/// Parenthesised tokens of a string, e.g. `DT105` and `B1&B3`.
fn parenthesised(value: &str) -> impl Iterator<Item = &str> {
    value
        .split('(')
        .skip(1)
        .filter_map(|v| v.split_once(')').map(|(inner, _)| inner.trim()))
}

/// Group markers are the parenthesised tokens naming several groups, like `B1&B3`.
fn group_markers(value: &str) -> impl Iterator<Item = &str> {
    parenthesised(value).filter(|token| token.contains('&'))
}

fn members(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(['/', '&', ','])
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// `B1/B3`, `B1` and `B3` all match the marker `B1&B3`.
pub fn batch_matches(batch: &str, marker: &str) -> bool {
    let wanted = members(batch).collect::<BTreeSet<_>>();
    members(marker).any(|member| wanted.contains(member))
}

/// Occurrences per week of every subject a batch has. Ordered by first appearance in the week.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyCounts {
    entries: Vec<(String, u32)>,
}

impl WeeklyCounts {
    fn add(&mut self, subject: String) {
        match self.entries.iter_mut().find(|(name, _)| *name == subject) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((subject, 1)),
        }
    }

    pub fn get(&self, subject: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name == subject)
            .map(|(_, count)| *count)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

pub fn weekly_counts(timetable: &Timetable, batch: &str) -> WeeklyCounts {
    let mut counts = WeeklyCounts::default();
    for (_, _, cell) in timetable.cells() {
        if let Some(subject) = subject_for_batch(cell, batch) {
            counts.add(subject);
        }
    }
    counts
}

/// Distinct subjects a batch has on a weekday, in slot order. `day` is case insensitive.
pub fn subjects_for_day(timetable: &Timetable, day: &str, batch: &str) -> Vec<String> {
    let mut subjects = Vec::new();
    for (_, cell) in timetable.day_cells(&day.to_uppercase()) {
        if let Some(subject) = subject_for_batch(cell, batch) {
            if !subjects.contains(&subject) {
                subjects.push(subject);
            }
        }
    }
    subjects
}

/// Batches mentioned in partitioned cells, written the way users type them (`B1&B3` → `B1/B3`).
pub fn detect_batches(timetable: &Timetable) -> Vec<String> {
    let batches = timetable
        .cells()
        .filter(|(_, _, cell)| cell.contains('/') && cell.contains('('))
        .flat_map(|(_, _, cell)| group_markers(cell).collect::<Vec<_>>())
        .map(|marker| members(marker).collect::<Vec<_>>().join("/"))
        .collect::<BTreeSet<_>>();

    if batches.is_empty() {
        DEFAULT_BATCHES.iter().map(|v| v.to_string()).collect()
    } else {
        batches.into_iter().collect()
    }
}
