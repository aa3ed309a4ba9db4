//! History module - per-exercise view over completed sessions
//!
//! Features:
//! - Exercise history index rebuilt from the full session list
//! - Template filter (synthetic "all templates" option first)
//! - Personal record and max reps per weight

pub mod records;

pub use records::{personal_record, reps_max_by_weight, weight_progression, RepsAtWeight};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::session::WorkoutSession;

/// One logged result of an exercise, flattened out of its session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseHistoryEntry {
    pub session_id: String,
    pub date: DateTime<Utc>,
    pub template_name: String,
    pub weight: f64,
    pub reps: f64,
    pub target: String,
}

/// Template filter for the history view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateFilter {
    /// Every template
    All,
    /// Only sessions of the named template
    Named(String),
}

impl TemplateFilter {
    pub fn matches(&self, template_name: &str) -> bool {
        match self {
            TemplateFilter::All => true,
            TemplateFilter::Named(name) => name == template_name,
        }
    }

    /// `None` selects every template
    pub fn from_option(name: Option<&str>) -> Self {
        match name {
            Some(name) => TemplateFilter::Named(name.to_string()),
            None => TemplateFilter::All,
        }
    }
}

impl fmt::Display for TemplateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateFilter::All => write!(f, "All templates"),
            TemplateFilter::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Exercise history index with the template filter options seen
#[derive(Debug, Clone, Default)]
pub struct ExerciseHistory {
    index: BTreeMap<String, Vec<ExerciseHistoryEntry>>,
    templates: Vec<TemplateFilter>,
}

impl ExerciseHistory {
    /// Build the index from every session of one user
    pub fn build(sessions: &[WorkoutSession]) -> Self {
        Self::build_at(sessions, Utc::now())
    }

    /// Build with an explicit "now" for sessions without a usable date
    pub fn build_at(sessions: &[WorkoutSession], now: DateTime<Utc>) -> Self {
        let mut index: BTreeMap<String, Vec<ExerciseHistoryEntry>> = BTreeMap::new();
        let mut template_names: BTreeSet<String> = BTreeSet::new();

        for session in sessions {
            let template_name = session.template_name();
            template_names.insert(template_name.to_string());

            let results = match &session.results {
                Some(results) => results,
                None => continue,
            };

            let date = session.resolve_date(now);
            for (exercise, result) in results {
                index.entry(exercise.clone()).or_default().push(ExerciseHistoryEntry {
                    session_id: session.id.clone(),
                    date,
                    template_name: template_name.to_string(),
                    weight: result.weight(),
                    reps: result.reps(),
                    target: result.target(),
                });
            }
        }

        for entries in index.values_mut() {
            entries.sort_by_key(|e| e.date);
        }

        let templates = std::iter::once(TemplateFilter::All)
            .chain(template_names.into_iter().map(TemplateFilter::Named))
            .collect();

        debug!(
            sessions = sessions.len(),
            exercises = index.len(),
            "built exercise history"
        );

        Self { index, templates }
    }

    /// Filter options: `All` first, then template names ascending
    pub fn templates(&self) -> &[TemplateFilter] {
        &self.templates
    }

    /// Every exercise name, ascending
    pub fn exercise_names(&self) -> Vec<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    /// Exercise names with at least one entry under the filter
    pub fn exercises_for_template(&self, filter: &TemplateFilter) -> Vec<&str> {
        match filter {
            TemplateFilter::All => self.exercise_names(),
            TemplateFilter::Named(_) => self
                .index
                .iter()
                .filter(|(_, entries)| entries.iter().any(|e| filter.matches(&e.template_name)))
                .map(|(name, _)| name.as_str())
                .collect(),
        }
    }

    /// Chronological entries of one exercise under the filter
    pub fn entries_for(&self, exercise: &str, filter: &TemplateFilter) -> Vec<&ExerciseHistoryEntry> {
        self.index
            .get(exercise)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| filter.matches(&e.template_name))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
