//! Session state machine
//!
//! Pure transitions over a [`GameSession`]. Nothing here touches storage or
//! locks: the caller hands in a copy of the session, the question bank and a
//! random source, and persists the result if the transition changed anything.

use rand::seq::IndexedRandom;
use rand::Rng;

use super::poll::audience_poll;
use super::prize::{prize_for, safe_score, MAX_LEVEL};
use super::questions::QuestionBank;
use crate::error::{GameError, GameResult};
use crate::types::{
    Choice, GameSession, Lifeline, OptionLabel, PollDistribution, Question, SessionStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Correct answer, moved on to the given level
    Advanced { level: u32 },
    /// Correct answer on the last level
    Won,
    /// Wrong answer or timeout
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifelineOutcome {
    /// Flag consumed. `poll` is only set for the audience poll.
    Used { poll: Option<PollDistribution> },
    /// Flag was already spent, nothing changed
    Ignored,
}

/// The single place terminal fields are written, always together
fn finish(session: &mut GameSession, status: SessionStatus, score: u64) {
    session.status = status;
    session.score = score;
    session.ended_at = Some(chrono::Utc::now().to_rfc3339());
}

fn finish_at_safe_haven(session: &mut GameSession, status: SessionStatus) {
    let score = safe_score(session.current_level);
    finish(session, status, score);
}

fn current_question<'a>(session: &GameSession, bank: &'a QuestionBank) -> GameResult<&'a Question> {
    let id = session
        .current_question
        .as_ref()
        .ok_or(GameError::NoQuestionsAtLevel(session.current_level))?;
    bank.get(id)
        .ok_or_else(|| GameError::MissingQuestion(id.clone()))
}

/// Apply an answer to the current question
pub fn answer<R: Rng + ?Sized>(
    session: &mut GameSession,
    choice: Choice,
    bank: &QuestionBank,
    rng: &mut R,
) -> GameResult<AnswerOutcome> {
    if !session.is_active() {
        return Err(GameError::NoActiveSession);
    }

    let chosen = match choice {
        Choice::Timeout => {
            finish_at_safe_haven(session, SessionStatus::Lost);
            return Ok(AnswerOutcome::Lost);
        }
        Choice::Option(label) => label,
    };

    let question = current_question(session, bank)?;
    if chosen != question.correct_option {
        finish_at_safe_haven(session, SessionStatus::Lost);
        return Ok(AnswerOutcome::Lost);
    }

    let level = session.current_level;
    let prize = prize_for(level).unwrap_or(0);

    if level >= MAX_LEVEL {
        finish(session, SessionStatus::Won, prize);
        return Ok(AnswerOutcome::Won);
    }

    // Draw before mutating anything so a missing level leaves the session as it was
    let next_level = level + 1;
    let next_question = bank
        .draw(next_level, &[], rng)
        .ok_or(GameError::NoQuestionForNextLevel(next_level))?;

    session.current_level = next_level;
    session.score = prize;
    session.current_question = Some(next_question.id.clone());
    session.eliminated_options.clear();

    Ok(AnswerOutcome::Advanced { level: next_level })
}

/// Spend a lifeline on the current question.
///
/// Each lifeline is gated only by its own flag; asking for a spent one is
/// ignored rather than rejected.
pub fn use_lifeline<R: Rng + ?Sized>(
    session: &mut GameSession,
    lifeline: Lifeline,
    bank: &QuestionBank,
    rng: &mut R,
) -> GameResult<LifelineOutcome> {
    if !session.is_active() {
        return Err(GameError::NoActiveSession);
    }
    if !session.lifelines.is_available(lifeline) {
        return Ok(LifelineOutcome::Ignored);
    }

    let poll = match lifeline {
        Lifeline::FiftyFifty => {
            let correct = current_question(session, bank)?.correct_option;
            let wrong: Vec<OptionLabel> = OptionLabel::ALL
                .into_iter()
                .filter(|&label| label != correct)
                .collect();
            let mut eliminated: Vec<OptionLabel> = wrong.choose_multiple(rng, 2).copied().collect();
            eliminated.sort();
            session.eliminated_options = eliminated;
            None
        }
        Lifeline::Skip => {
            let exclude: Vec<_> = session.current_question.iter().cloned().collect();
            match bank.draw(session.current_level, &exclude, rng) {
                Some(replacement) => {
                    session.current_question = Some(replacement.id.clone());
                    session.eliminated_options.clear();
                }
                None => {
                    tracing::warn!(
                        "Skip in session {} found no question at level {}; flag consumed anyway",
                        session.id,
                        session.current_level
                    );
                }
            }
            None
        }
        Lifeline::AudiencePoll => {
            let correct = current_question(session, bank)?.correct_option;
            Some(audience_poll(correct, rng))
        }
    };

    session.lifelines.consume(lifeline);
    Ok(LifelineOutcome::Used { poll })
}

/// Walk away with the safe-haven amount. Returns false if already over.
pub fn quit(session: &mut GameSession) -> bool {
    if !session.is_active() {
        return false;
    }
    finish_at_safe_haven(session, SessionStatus::Quit);
    true
}

/// Close a session superseded by a fresh start
pub fn retire(session: &mut GameSession) {
    quit(session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::questions::tests::make_input;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Bank with two questions per level, correct option always A
    fn full_bank() -> QuestionBank {
        let mut bank = QuestionBank::new();
        for level in 1..=MAX_LEVEL {
            bank.insert(make_input(level, &format!("Level {} first", level), "A"))
                .unwrap();
            bank.insert(make_input(level, &format!("Level {} second", level), "A"))
                .unwrap();
        }
        bank
    }

    fn session_at(bank: &QuestionBank, level: u32, rng: &mut StdRng) -> GameSession {
        let question = bank.draw(level, &[], rng).unwrap();
        let mut session = GameSession::new("player".to_string(), question.id.clone());
        session.current_level = level;
        session.score = level.checked_sub(1).and_then(prize_for).unwrap_or(0);
        session
    }

    fn pick(label: OptionLabel) -> Choice {
        Choice::Option(label)
    }

    #[test]
    fn test_correct_answer_advances_and_banks_previous_level() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = session_at(&bank, 1, &mut rng);
        let first_question = session.current_question.clone();

        let outcome = answer(&mut session, pick(OptionLabel::A), &bank, &mut rng).unwrap();

        assert_eq!(outcome, AnswerOutcome::Advanced { level: 2 });
        assert_eq!(session.current_level, 2);
        assert_eq!(session.score, 1_000);
        assert_eq!(session.status, SessionStatus::Active);
        assert_ne!(session.current_question, first_question);
        let id = session.current_question.as_ref().unwrap();
        assert_eq!(bank.get(id).unwrap().level, 2);
    }

    #[test]
    fn test_advance_keeps_lifelines_and_clears_eliminated() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = session_at(&bank, 3, &mut rng);

        use_lifeline(&mut session, Lifeline::FiftyFifty, &bank, &mut rng).unwrap();
        assert_eq!(session.eliminated_options.len(), 2);

        answer(&mut session, pick(OptionLabel::A), &bank, &mut rng).unwrap();

        assert!(session.eliminated_options.is_empty());
        assert!(!session.lifelines.fifty_fifty);
        assert!(session.lifelines.skip);
        assert!(session.lifelines.audience_poll);
    }

    #[test]
    fn test_win_at_level_15() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = session_at(&bank, 15, &mut rng);

        let outcome = answer(&mut session, pick(OptionLabel::A), &bank, &mut rng).unwrap();

        assert_eq!(outcome, AnswerOutcome::Won);
        assert_eq!(session.status, SessionStatus::Won);
        assert_eq!(session.score, 10_000_000);
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn test_wrong_answer_at_level_7_keeps_first_safe_haven() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(4);
        let mut session = session_at(&bank, 7, &mut rng);

        let outcome = answer(&mut session, pick(OptionLabel::C), &bank, &mut rng).unwrap();

        assert_eq!(outcome, AnswerOutcome::Lost);
        assert_eq!(session.status, SessionStatus::Lost);
        assert_eq!(session.score, 10_000);
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn test_wrong_answer_at_level_5_gets_nothing() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = session_at(&bank, 5, &mut rng);

        answer(&mut session, pick(OptionLabel::B), &bank, &mut rng).unwrap();

        assert_eq!(session.status, SessionStatus::Lost);
        assert_eq!(session.score, 0);
    }

    #[test]
    fn test_timeout_matches_wrong_answer() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(6);

        let mut timed_out = session_at(&bank, 12, &mut rng);
        let mut wrong = timed_out.clone();

        answer(&mut timed_out, Choice::Timeout, &bank, &mut rng).unwrap();
        answer(&mut wrong, pick(OptionLabel::D), &bank, &mut rng).unwrap();

        assert_eq!(timed_out.status, SessionStatus::Lost);
        assert_eq!(timed_out.score, 320_000);
        assert_eq!(timed_out.status, wrong.status);
        assert_eq!(timed_out.score, wrong.score);
    }

    #[test]
    fn test_missing_next_level_leaves_session_untouched() {
        let mut bank = QuestionBank::new();
        bank.insert(make_input(1, "Only level one", "A")).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = session_at(&bank, 1, &mut rng);
        let before = session.clone();

        let result = answer(&mut session, pick(OptionLabel::A), &bank, &mut rng);

        assert_eq!(result, Err(GameError::NoQuestionForNextLevel(2)));
        assert_eq!(session, before);
    }

    #[test]
    fn test_terminal_session_rejects_events() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(8);
        let mut session = session_at(&bank, 2, &mut rng);
        assert!(quit(&mut session));
        let finished = session.clone();

        assert_eq!(
            answer(&mut session, pick(OptionLabel::A), &bank, &mut rng),
            Err(GameError::NoActiveSession)
        );
        assert_eq!(
            use_lifeline(&mut session, Lifeline::Skip, &bank, &mut rng),
            Err(GameError::NoActiveSession)
        );
        assert!(!quit(&mut session));
        assert_eq!(session, finished);
    }

    #[test]
    fn test_quit_at_level_1() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = session_at(&bank, 1, &mut rng);

        assert!(quit(&mut session));
        assert_eq!(session.status, SessionStatus::Quit);
        assert_eq!(session.score, 0);
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn test_quit_after_second_safe_haven() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(10);
        let mut session = session_at(&bank, 11, &mut rng);

        quit(&mut session);
        assert_eq!(session.score, 320_000);
    }

    #[test]
    fn test_fifty_fifty_eliminates_two_wrong_options() {
        let mut bank = QuestionBank::new();
        for (i, correct) in ["A", "B", "C", "D"].iter().enumerate() {
            bank.insert(make_input(1, &format!("Question {}", i), correct))
                .unwrap();
        }
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let mut session = session_at(&bank, 1, &mut rng);
            let correct = bank
                .get(session.current_question.as_ref().unwrap())
                .unwrap()
                .correct_option;

            let outcome =
                use_lifeline(&mut session, Lifeline::FiftyFifty, &bank, &mut rng).unwrap();

            assert_eq!(outcome, LifelineOutcome::Used { poll: None });
            assert_eq!(session.eliminated_options.len(), 2);
            assert_ne!(session.eliminated_options[0], session.eliminated_options[1]);
            assert!(!session.eliminated_options.contains(&correct));
            assert!(!session.lifelines.fifty_fifty);
        }
    }

    #[test]
    fn test_lifeline_used_only_once() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(12);
        let mut session = session_at(&bank, 4, &mut rng);

        use_lifeline(&mut session, Lifeline::FiftyFifty, &bank, &mut rng).unwrap();
        let after_first = session.clone();

        let outcome = use_lifeline(&mut session, Lifeline::FiftyFifty, &bank, &mut rng).unwrap();

        assert_eq!(outcome, LifelineOutcome::Ignored);
        assert_eq!(session, after_first);
    }

    #[test]
    fn test_skip_draws_different_question_same_level() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..20 {
            let mut session = session_at(&bank, 6, &mut rng);
            let before = session.current_question.clone();
            session.eliminated_options = vec![OptionLabel::B, OptionLabel::C];

            use_lifeline(&mut session, Lifeline::Skip, &bank, &mut rng).unwrap();

            assert_ne!(session.current_question, before);
            assert_eq!(session.current_level, 6);
            assert!(session.eliminated_options.is_empty());
            assert!(!session.lifelines.skip);
        }
    }

    #[test]
    fn test_skip_with_single_question_reserves_it() {
        let mut bank = QuestionBank::new();
        bank.insert(make_input(1, "Only one", "A")).unwrap();
        let mut rng = StdRng::seed_from_u64(14);
        let mut session = session_at(&bank, 1, &mut rng);
        let before = session.current_question.clone();

        use_lifeline(&mut session, Lifeline::Skip, &bank, &mut rng).unwrap();

        assert_eq!(session.current_question, before);
        assert!(!session.lifelines.skip);
    }

    #[test]
    fn test_skip_on_empty_level_still_consumes_flag() {
        let mut bank = QuestionBank::new();
        let question = bank.insert(make_input(1, "Level one", "A")).unwrap();
        let mut rng = StdRng::seed_from_u64(15);

        // Session sitting on level 2 which has no questions in the bank
        let mut session = GameSession::new("player".to_string(), question.id.clone());
        session.current_level = 2;

        let outcome = use_lifeline(&mut session, Lifeline::Skip, &bank, &mut rng).unwrap();

        assert_eq!(outcome, LifelineOutcome::Used { poll: None });
        assert_eq!(session.current_question, Some(question.id));
        assert!(!session.lifelines.skip);
    }

    #[test]
    fn test_audience_poll_does_not_touch_progress() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(16);
        let mut session = session_at(&bank, 8, &mut rng);
        let before = session.clone();

        let outcome = use_lifeline(&mut session, Lifeline::AudiencePoll, &bank, &mut rng).unwrap();

        let poll = match outcome {
            LifelineOutcome::Used { poll: Some(poll) } => poll,
            other => panic!("Expected a poll, got {:?}", other),
        };
        assert_eq!(poll.total(), 100);
        assert!(poll.share(OptionLabel::A) >= 45);
        assert_eq!(session.current_level, before.current_level);
        assert_eq!(session.score, before.score);
        assert_eq!(session.current_question, before.current_question);
        assert!(!session.lifelines.audience_poll);
    }

    #[test]
    fn test_lifelines_are_independent() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(17);
        let mut session = session_at(&bank, 2, &mut rng);

        use_lifeline(&mut session, Lifeline::AudiencePoll, &bank, &mut rng).unwrap();
        let outcome = use_lifeline(&mut session, Lifeline::FiftyFifty, &bank, &mut rng).unwrap();

        assert!(matches!(outcome, LifelineOutcome::Used { .. }));
        assert!(session.lifelines.skip);
    }

    #[test]
    fn test_full_climb_to_the_top() {
        let bank = full_bank();
        let mut rng = StdRng::seed_from_u64(18);
        let mut session = session_at(&bank, 1, &mut rng);

        for level in 1..MAX_LEVEL {
            let outcome = answer(&mut session, pick(OptionLabel::A), &bank, &mut rng).unwrap();
            assert_eq!(outcome, AnswerOutcome::Advanced { level: level + 1 });
            assert_eq!(session.score, prize_for(level).unwrap());
        }

        let outcome = answer(&mut session, pick(OptionLabel::A), &bank, &mut rng).unwrap();
        assert_eq!(outcome, AnswerOutcome::Won);
        assert_eq!(session.score, 10_000_000);
    }
}
