//! Game session operations
//!
//! Each call is one atomic read-modify-write of the player's session: the
//! player's mutex is held across load, transition and version-checked store.

use rand::rngs::StdRng;
use std::collections::HashMap;

use super::machine::{self, AnswerOutcome, LifelineOutcome};
use super::prize::{prize_for, safe_score};
use super::questions::{LoadReport, QuestionBank};
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;

impl AppState {
    /// Build the player-facing view of a session
    pub async fn session_view(&self, session: &GameSession) -> SessionView {
        let question = if session.is_active() {
            let bank = self.questions.read().await;
            session
                .current_question
                .as_ref()
                .and_then(|id| bank.get(id))
                .map(QuestionView::from)
        } else {
            None
        };

        SessionView {
            session_id: session.id.clone(),
            level: session.current_level,
            question,
            eliminated_options: session.eliminated_options.clone(),
            lifelines: session.lifelines,
            score: session.score,
            current_prize: prize_for(session.current_level).unwrap_or(0),
            safe_score: safe_score(session.current_level),
            status: session.status,
            started_at: session.started_at.clone(),
            ended_at: session.ended_at.clone(),
        }
    }

    /// Load the player's active session, apply `transition`, and store it if it
    /// reports a change
    async fn mutate_active<T, F>(
        &self,
        player_id: &PlayerId,
        transition: F,
    ) -> GameResult<(GameSession, T)>
    where
        F: FnOnce(&mut GameSession, &QuestionBank, &mut StdRng) -> GameResult<(bool, T)>,
    {
        let _guard = self.lock_player(player_id).await;

        let mut session = self
            .sessions
            .active_for(player_id)
            .await
            .ok_or(GameError::NoActiveSession)?;

        // Held until the write lands so a reseed cannot slip in between
        let bank = self.questions.read().await;
        let (changed, output) = {
            let mut rng = self.rng.lock().await;
            transition(&mut session, &bank, &mut rng)?
        };

        let session = if changed {
            self.sessions.update(session).await?
        } else {
            session
        };
        drop(bank);

        Ok((session, output))
    }

    /// Start a fresh game, closing any session the player still has open
    pub async fn start_game(&self, player_id: &PlayerId) -> GameResult<SessionView> {
        let _guard = self.lock_player(player_id).await;

        let bank = self.questions.read().await;
        let first_question = {
            let mut rng = self.rng.lock().await;
            bank.draw(1, &[], &mut *rng).map(|q| q.id.clone())
        };
        let Some(first_question) = first_question else {
            tracing::error!(
                "Cannot start game for {}: no questions at level 1",
                player_id
            );
            return Err(GameError::NoQuestionsAtLevel(1));
        };

        let session = GameSession::new(player_id.clone(), first_question);
        let retired = self
            .sessions
            .replace_active(session.clone(), machine::retire)
            .await?;
        drop(bank);

        if let Some(old) = retired {
            tracing::info!(
                "Player {} restarted; session {} closed at level {} with {}",
                player_id,
                old.id,
                old.current_level,
                old.score
            );
        }
        tracing::info!("Started session {} for player {}", session.id, player_id);

        Ok(self.session_view(&session).await)
    }

    pub async fn get_active_session(&self, player_id: &PlayerId) -> Option<SessionView> {
        let session = self.sessions.active_for(player_id).await?;
        Some(self.session_view(&session).await)
    }

    /// Answer the current question with "A".."D" or "TIMEOUT"
    pub async fn submit_answer(
        &self,
        player_id: &PlayerId,
        choice: &str,
    ) -> GameResult<SessionView> {
        let (session, outcome) = self
            .mutate_active(player_id, |session, bank, rng| {
                let choice = choice.parse::<Choice>()?;
                let outcome = machine::answer(session, choice, bank, rng).inspect_err(|e| {
                    if e.kind() == crate::error::ErrorKind::DataIntegrity {
                        tracing::error!(
                            "Session {} stuck at level {}: {}",
                            session.id,
                            session.current_level,
                            e
                        );
                    }
                })?;
                Ok((true, outcome))
            })
            .await?;

        match outcome {
            AnswerOutcome::Advanced { level } => {
                tracing::info!("Session {} advanced to level {}", session.id, level)
            }
            AnswerOutcome::Won => tracing::info!("Session {} won {}", session.id, session.score),
            AnswerOutcome::Lost => tracing::info!(
                "Session {} lost at level {}, keeps {}",
                session.id,
                session.current_level,
                session.score
            ),
        }

        Ok(self.session_view(&session).await)
    }

    /// Use a lifeline by name. A lifeline that was already spent is ignored.
    pub async fn use_lifeline(
        &self,
        player_id: &PlayerId,
        kind: &str,
    ) -> GameResult<(SessionView, Option<PollDistribution>)> {
        let (session, (lifeline, outcome)) = self
            .mutate_active(player_id, |session, bank, rng| {
                let lifeline = kind.parse::<Lifeline>()?;
                let outcome = machine::use_lifeline(session, lifeline, bank, rng)?;
                let changed = matches!(outcome, LifelineOutcome::Used { .. });
                Ok((changed, (lifeline, outcome)))
            })
            .await?;

        let poll = match outcome {
            LifelineOutcome::Used { poll } => {
                tracing::info!("Session {} used {}", session.id, lifeline);
                poll
            }
            LifelineOutcome::Ignored => {
                tracing::warn!("Session {} already used {}, ignoring", session.id, lifeline);
                None
            }
        };

        Ok((self.session_view(&session).await, poll))
    }

    /// Walk away with the current safe-haven amount
    pub async fn quit_game(&self, player_id: &PlayerId) -> GameResult<SessionView> {
        let (session, _) = self
            .mutate_active(player_id, |session, _, _| Ok((machine::quit(session), ())))
            .await?;

        tracing::info!(
            "Session {} quit at level {} with {}",
            session.id,
            session.current_level,
            session.score
        );
        Ok(self.session_view(&session).await)
    }

    /// The player's most recently finished session
    pub async fn get_result(&self, player_id: &PlayerId) -> Option<SessionView> {
        let session = self.sessions.latest_finished(player_id).await?;
        Some(self.session_view(&session).await)
    }

    /// Bulk-load questions. A reseed (`replace`) also closes every active
    /// session whose current question is gone.
    pub async fn load_questions(
        &self,
        inputs: Vec<QuestionInput>,
        replace: bool,
    ) -> GameResult<LoadReport> {
        let report = {
            let mut bank = self.questions.write().await;
            let report = bank.bulk_load(inputs, replace)?;

            let missing = bank.missing_levels();
            if !missing.is_empty() {
                tracing::warn!("Question bank has no questions at levels {:?}", missing);
            }
            report
        };

        if replace {
            self.retire_orphaned_sessions().await;
        }
        Ok(report)
    }

    async fn retire_orphaned_sessions(&self) {
        let owners: Vec<PlayerId> = self
            .sessions
            .all()
            .await
            .into_iter()
            .filter(|s| s.is_active())
            .map(|s| s.owner)
            .collect();

        for owner in owners {
            let result = self
                .mutate_active(&owner, |session, bank, _| {
                    let orphaned = session
                        .current_question
                        .as_ref()
                        .is_none_or(|id| bank.get(id).is_none());
                    if orphaned {
                        machine::retire(session);
                    }
                    Ok((orphaned, orphaned))
                })
                .await;

            match result {
                Ok((session, true)) => tracing::warn!(
                    "Session {} closed at level {} with {}: its question was removed",
                    session.id,
                    session.current_level,
                    session.score
                ),
                Ok(_) | Err(GameError::NoActiveSession) => {}
                Err(e) => tracing::error!("Could not check session of {}: {}", owner, e),
            }
        }
    }

    /// Finished sessions of a player, newest first
    pub async fn history(&self, player_id: &PlayerId, limit: usize) -> Vec<SessionView> {
        let mut views = Vec::new();
        for session in self
            .sessions
            .history_for(player_id)
            .await
            .iter()
            .filter(|s| !s.is_active())
            .take(limit)
        {
            views.push(self.session_view(session).await);
        }
        views
    }

    /// Highest final score over the player's finished sessions
    pub async fn best_score(&self, player_id: &PlayerId) -> u64 {
        self.sessions
            .history_for(player_id)
            .await
            .iter()
            .filter(|s| !s.is_active())
            .map(|s| s.score)
            .max()
            .unwrap_or(0)
    }

    /// Best finished score per player, highest first.
    ///
    /// Ties go to whoever reached the score first.
    pub async fn get_leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        // player -> (best score, position in end order)
        let mut best: HashMap<PlayerId, (u64, usize)> = HashMap::new();
        for (position, session) in self.sessions.finished().await.into_iter().enumerate() {
            let entry = best
                .entry(session.owner)
                .or_insert((session.score, position));
            if session.score > entry.0 {
                *entry = (session.score, position);
            }
        }

        let mut ranked: Vec<(PlayerId, u64, usize)> = best
            .into_iter()
            .map(|(player_id, (score, position))| (player_id, score, position))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));

        let players = self.players.read().await;
        ranked
            .into_iter()
            .take(limit)
            .map(|(player_id, best_score, _)| LeaderboardEntry {
                display_name: players.get(&player_id).map(|p| p.display_name.clone()),
                player_id,
                best_score,
            })
            .collect()
    }
}
