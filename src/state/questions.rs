//! Question bank: read-mostly pool of questions indexed by level
//!
//! Questions are loaded in bulk (seed data, admin import, snapshot restore)
//! and drawn at random per level by the session state machine.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::prize::MAX_LEVEL;
use crate::error::{GameError, GameResult};
use crate::types::{OptionLabel, Question, QuestionId, QuestionInput};

/// Questions shipped with the binary: two per level
const DEFAULT_QUESTIONS: &str = include_str!("../../data/questions.json");

/// Outcome of a bulk load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub inserted: usize,
    pub skipped_duplicates: usize,
}

/// Number of questions available at one level
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LevelStats {
    pub level: u32,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    by_id: HashMap<QuestionId, Question>,
    by_level: BTreeMap<u32, Vec<QuestionId>>,
    fingerprints: HashSet<String>,
}

/// Content fingerprint used to skip re-imported questions.
/// Case and whitespace differences in the text do not count.
pub fn fingerprint(level: u32, text: &str) -> String {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(level.to_be_bytes());
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a JSON array of question records
pub fn parse_inputs(json: &str) -> GameResult<Vec<QuestionInput>> {
    serde_json::from_str(json).map_err(|e| GameError::InvalidQuestion(e.to_string()))
}

fn validate(input: QuestionInput) -> GameResult<Question> {
    if input.level == 0 || input.level > MAX_LEVEL {
        return Err(GameError::InvalidQuestion(format!(
            "level {} is outside 1..={}",
            input.level, MAX_LEVEL
        )));
    }

    let text = input.text.trim().to_string();
    if text.is_empty() {
        return Err(GameError::InvalidQuestion(
            "question text cannot be empty".to_string(),
        ));
    }

    let options = [
        input.option_a.trim().to_string(),
        input.option_b.trim().to_string(),
        input.option_c.trim().to_string(),
        input.option_d.trim().to_string(),
    ];
    if let Some(label) = OptionLabel::ALL
        .iter()
        .find(|label| options[label.index()].is_empty())
    {
        return Err(GameError::InvalidQuestion(format!(
            "option {} of '{}' is empty",
            label, text
        )));
    }

    let correct_option = input.correct_option.parse::<OptionLabel>().map_err(|_| {
        GameError::InvalidQuestion(format!(
            "correct option '{}' of '{}' must be one of A, B, C, D",
            input.correct_option, text
        ))
    })?;

    Ok(Question {
        id: ulid::Ulid::new().to_string(),
        text,
        options,
        correct_option,
        difficulty: input.difficulty,
        level: input.level,
    })
}

impl QuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bank pre-filled with the bundled question set
    pub fn with_defaults() -> GameResult<Self> {
        let mut bank = Self::new();
        bank.bulk_load(parse_inputs(DEFAULT_QUESTIONS)?, true)?;
        Ok(bank)
    }

    /// Bank loaded from an operator-supplied JSON file's contents
    pub fn from_json(json: &str) -> GameResult<Self> {
        let mut bank = Self::new();
        bank.bulk_load(parse_inputs(json)?, true)?;
        Ok(bank)
    }

    /// Add a single question
    pub fn insert(&mut self, input: QuestionInput) -> GameResult<Question> {
        let question = validate(input)?;
        self.put(question.clone());
        Ok(question)
    }

    /// Load many questions at once.
    ///
    /// Every record is validated before anything is inserted, so a bad record
    /// leaves the bank untouched. `replace` clears the bank first. Records whose
    /// fingerprint is already present are skipped.
    pub fn bulk_load(
        &mut self,
        inputs: Vec<QuestionInput>,
        replace: bool,
    ) -> GameResult<LoadReport> {
        let questions = inputs
            .into_iter()
            .map(validate)
            .collect::<GameResult<Vec<_>>>()?;

        if replace {
            self.clear();
        }

        let mut report = LoadReport::default();
        for question in questions {
            if self.put(question) {
                report.inserted += 1;
            } else {
                report.skipped_duplicates += 1;
            }
        }

        tracing::info!(
            "Loaded {} questions ({} duplicates skipped, replace={})",
            report.inserted,
            report.skipped_duplicates,
            replace
        );
        Ok(report)
    }

    /// Replace the bank with already-validated questions, keeping their ids
    pub fn restore(&mut self, questions: Vec<Question>) {
        self.clear();
        for question in questions {
            self.put(question);
        }
    }

    fn put(&mut self, question: Question) -> bool {
        if !self
            .fingerprints
            .insert(fingerprint(question.level, &question.text))
        {
            return false;
        }
        self.by_level
            .entry(question.level)
            .or_default()
            .push(question.id.clone());
        self.by_id.insert(question.id.clone(), question);
        true
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_level.clear();
        self.fingerprints.clear();
    }

    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.by_id.get(id)
    }

    pub fn at_level(&self, level: u32) -> Vec<&Question> {
        self.by_level
            .get(&level)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Pick a random question for `level`, avoiding `exclude` where possible.
    ///
    /// If the exclusion empties the pool the full level pool is used instead.
    /// `None` only when the level has no questions at all.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        level: u32,
        exclude: &[QuestionId],
        rng: &mut R,
    ) -> Option<&Question> {
        let pool = self.at_level(level);
        let filtered: Vec<&Question> = pool
            .iter()
            .copied()
            .filter(|q| !exclude.contains(&q.id))
            .collect();

        if filtered.is_empty() {
            pool.choose(rng).copied()
        } else {
            filtered.choose(rng).copied()
        }
    }

    /// Levels of the ladder with no question to ask
    pub fn missing_levels(&self) -> Vec<u32> {
        (1..=MAX_LEVEL)
            .filter(|level| self.by_level.get(level).is_none_or(|ids| ids.is_empty()))
            .collect()
    }

    pub fn stats(&self) -> Vec<LevelStats> {
        (1..=MAX_LEVEL)
            .map(|level| LevelStats {
                level,
                count: self.by_level.get(&level).map_or(0, Vec::len),
            })
            .collect()
    }

    /// All questions, ordered by level
    pub fn all(&self) -> Vec<Question> {
        self.by_level
            .values()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
