use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::GameError;

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type SessionId = String;
pub type QuestionId = String;

/// Option label for the four answer slots of a question
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [
        OptionLabel::A,
        OptionLabel::B,
        OptionLabel::C,
        OptionLabel::D,
    ];

    /// Position of this label in a question's option array
    pub fn index(self) -> usize {
        match self {
            OptionLabel::A => 0,
            OptionLabel::B => 1,
            OptionLabel::C => 2,
            OptionLabel::D => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLabel {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionLabel::A),
            "B" => Ok(OptionLabel::B),
            "C" => Ok(OptionLabel::C),
            "D" => Ok(OptionLabel::D),
            _ => Err(GameError::InvalidChoice(s.to_string())),
        }
    }
}

/// A player's answer to the current question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Option(OptionLabel),
    /// Client-side answer timer ran out
    Timeout,
}

impl FromStr for Choice {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("TIMEOUT") {
            return Ok(Choice::Timeout);
        }
        s.parse::<OptionLabel>().map(Choice::Option)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Lifeline {
    FiftyFifty,
    Skip,
    AudiencePoll,
}

impl Lifeline {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifeline::FiftyFifty => "fifty_fifty",
            Lifeline::Skip => "skip",
            Lifeline::AudiencePoll => "audience_poll",
        }
    }
}

impl fmt::Display for Lifeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifeline {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fifty_fifty" => Ok(Lifeline::FiftyFifty),
            "skip" => Ok(Lifeline::Skip),
            "audience_poll" => Ok(Lifeline::AudiencePoll),
            _ => Err(GameError::InvalidLifeline(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Won,
    Lost,
    Quit,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        self != SessionStatus::Active
    }
}

/// Availability of the three single-use lifelines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lifelines {
    pub fifty_fifty: bool,
    pub skip: bool,
    pub audience_poll: bool,
}

impl Default for Lifelines {
    fn default() -> Self {
        Self {
            fifty_fifty: true,
            skip: true,
            audience_poll: true,
        }
    }
}

impl Lifelines {
    pub fn is_available(&self, lifeline: Lifeline) -> bool {
        match lifeline {
            Lifeline::FiftyFifty => self.fifty_fifty,
            Lifeline::Skip => self.skip,
            Lifeline::AudiencePoll => self.audience_poll,
        }
    }

    /// Mark a lifeline as used. There is no way back to `true`.
    pub fn consume(&mut self, lifeline: Lifeline) {
        match lifeline {
            Lifeline::FiftyFifty => self.fifty_fifty = false,
            Lifeline::Skip => self.skip = false,
            Lifeline::AudiencePoll => self.audience_poll = false,
        }
    }
}

/// A multiple-choice question. Level and difficulty never change after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    /// Option texts in A, B, C, D order
    pub options: [String; 4],
    pub correct_option: OptionLabel,
    pub difficulty: Difficulty,
    pub level: u32,
}

impl Question {
    pub fn option_text(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }
}

/// Bulk-load record, same field layout as the seeding data files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub level: u32,
}

/// One player's attempt at the prize ladder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSession {
    pub id: SessionId,
    pub owner: PlayerId,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub current_level: u32,
    pub score: u64,
    pub status: SessionStatus,
    pub lifelines: Lifelines,
    pub current_question: Option<QuestionId>,
    /// Options hidden by fifty-fifty for the current question only
    #[serde(default)]
    pub eliminated_options: Vec<OptionLabel>,
    /// Bumped on every store write (optimistic concurrency)
    pub version: u64,
}

impl GameSession {
    pub fn new(owner: PlayerId, first_question: QuestionId) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            owner,
            started_at: chrono::Utc::now().to_rfc3339(),
            ended_at: None,
            current_level: 1,
            score: 0,
            status: SessionStatus::Active,
            lifelines: Lifelines::default(),
            current_question: Some(first_question),
            eliminated_options: Vec::new(),
            version: 1,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Question as shown to the player (never carries the correct option)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<OptionView>,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionView {
    pub label: OptionLabel,
    pub text: String,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: OptionLabel::ALL
                .iter()
                .map(|&label| OptionView {
                    label,
                    text: q.option_text(label).to_string(),
                })
                .collect(),
            difficulty: q.difficulty,
        }
    }
}

/// Everything the presentation layer may render about a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub session_id: SessionId,
    pub level: u32,
    /// `None` once the session is over
    pub question: Option<QuestionView>,
    pub eliminated_options: Vec<OptionLabel>,
    pub lifelines: Lifelines,
    pub score: u64,
    /// Prize for answering the current question correctly
    pub current_prize: u64,
    /// Amount kept if the player fails or quits now
    pub safe_score: u64,
    pub status: SessionStatus,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// Simulated audience answer percentages, summing to 100
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PollDistribution(pub BTreeMap<OptionLabel, u32>);

impl PollDistribution {
    pub fn share(&self, label: OptionLabel) -> u32 {
        self.0.get(&label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub display_name: Option<String>,
    pub best_score: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub token: String,
    pub display_name: String,
    pub created_at: String,
}

/// One row of the prize ladder for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrizeLevel {
    pub level: u32,
    pub amount: u64,
    pub safe_haven: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_parsing() {
        assert_eq!("a".parse(), Ok(Choice::Option(OptionLabel::A)));
        assert_eq!(" D ".parse(), Ok(Choice::Option(OptionLabel::D)));
        assert_eq!("timeout".parse::<Choice>().unwrap(), Choice::Timeout);
        assert_eq!("TIMEOUT".parse::<Choice>().unwrap(), Choice::Timeout);

        let err = "E".parse::<Choice>().unwrap_err();
        assert_eq!(err, GameError::InvalidChoice("E".to_string()));
        assert!("".parse::<Choice>().is_err());
        assert!("AB".parse::<Choice>().is_err());
    }

    #[test]
    fn test_lifeline_parsing() {
        assert_eq!("fifty_fifty".parse(), Ok(Lifeline::FiftyFifty));
        assert_eq!("skip".parse::<Lifeline>().unwrap(), Lifeline::Skip);
        assert_eq!("audience_poll".parse(), Ok(Lifeline::AudiencePoll));
        assert!(matches!(
            "phone_a_friend".parse::<Lifeline>(),
            Err(GameError::InvalidLifeline(_))
        ));
    }

    #[test]
    fn test_lifelines_consume_is_one_way() {
        let mut lifelines = Lifelines::default();
        assert!(lifelines.is_available(Lifeline::Skip));

        lifelines.consume(Lifeline::Skip);
        lifelines.consume(Lifeline::Skip);

        assert!(!lifelines.skip);
        assert!(lifelines.fifty_fifty);
        assert!(lifelines.audience_poll);
    }

    #[test]
    fn test_question_view_hides_answer() {
        let question = Question {
            id: "q1".to_string(),
            text: "Which planet is known as the Red Planet?".to_string(),
            options: [
                "Earth".to_string(),
                "Mars".to_string(),
                "Jupiter".to_string(),
                "Saturn".to_string(),
            ],
            correct_option: OptionLabel::B,
            difficulty: Difficulty::Easy,
            level: 1,
        };

        let view = QuestionView::from(&question);
        assert_eq!(view.options.len(), 4);
        assert_eq!(view.options[1].label, OptionLabel::B);
        assert_eq!(view.options[1].text, "Mars");

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("correct"));
    }

    #[test]
    fn test_poll_distribution_serializes_as_label_map() {
        let poll = PollDistribution(BTreeMap::from([
            (OptionLabel::A, 10),
            (OptionLabel::B, 60),
            (OptionLabel::C, 20),
            (OptionLabel::D, 10),
        ]));

        let json = serde_json::to_value(&poll).unwrap();
        assert_eq!(json["B"], 60);
        assert_eq!(poll.total(), 100);
    }
}
