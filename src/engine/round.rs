//! Timed multiple-choice quiz rounds.
//!
//! One question is active at a time. It resolves either through
//! `submit_answer` or when its countdown runs out, and the next question is
//! presented a fixed delay later. The countdown and the delayed advance are
//! timers on the engine's own scheduler, pumped by `advance_clock`.

use super::GameError;
use super::scheduler::{Scheduler, TimerId};
use crate::store::{HighScore, ScoreStore};
use log::{debug, info};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

pub const QUESTION_SECS: u32 = 15;
pub const BASE_POINTS: u32 = 500;
pub const PENALTY_PER_SEC: u32 = 25;
pub const TICK_MS: u64 = 1_000;
pub const ADVANCE_DELAY_MS: u64 = 3_000;
pub const HIGH_SCORE_KEY: &str = "HighScoreTrivia";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question
{
    pub prompt: String,
    pub correct_answer: String,
    pub distractors: Vec<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

impl Question
{
    pub fn new(
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
        distractors: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self
    {
        Self {
            prompt: prompt.into(),
            correct_answer: correct_answer.into(),
            distractors: distractors.into_iter().map(Into::into).collect(),
            category: None,
            difficulty: None,
        }
    }

    pub fn check(&self) -> Result<(), String>
    {
        if self.distractors.is_empty() {
            return Err("no wrong answers to choose from".to_string());
        }
        let mut seen = HashSet::new();
        seen.insert(self.correct_answer.as_str());
        for answer in &self.distractors {
            if !seen.insert(answer.as_str()) {
                return Err(format!("answer '{answer}' appears more than once"));
            }
        }
        Ok(())
    }
}

/// Points for a correct answer after `elapsed_secs` whole seconds.
pub fn points_for(elapsed_secs: u32) -> u32
{
    BASE_POINTS.saturating_sub(PENALTY_PER_SEC.saturating_mul(elapsed_secs))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundEvent
{
    QuestionPresented {
        index: usize,
        total: usize,
        prompt: String,
        choices: Vec<String>,
        remaining_secs: u32,
    },
    Tick { remaining_secs: u32 },
    Answered {
        choice: usize,
        correct: bool,
        correct_index: usize,
        points: u32,
        score: u32,
    },
    TimeUp { correct_index: usize },
    Finished {
        score: u32,
        high_score: u32,
        new_high_score: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundStatus
{
    Idle,
    Active,
    Finished,
}

#[derive(Debug)]
enum Timer
{
    Tick,
    Advance,
}

pub struct RoundEngine<R, S>
{
    rng: R,
    high_score: HighScore<S>,
    questions: Vec<Question>,
    current: usize,
    score: u32,
    remaining_secs: u32,
    answered: bool,
    choices: Vec<String>,
    correct_index: usize,
    status: RoundStatus,
    timers: Scheduler<Timer>,
    countdown: Option<TimerId>,
    pending_advance: Option<TimerId>,
}

impl<R: Rng, S: ScoreStore> RoundEngine<R, S>
{
    pub fn new(rng: R, store: S) -> Self
    {
        Self {
            rng,
            high_score: HighScore::load(store, HIGH_SCORE_KEY),
            questions: Vec::new(),
            current: 0,
            score: 0,
            remaining_secs: QUESTION_SECS,
            answered: false,
            choices: Vec::new(),
            correct_index: 0,
            status: RoundStatus::Idle,
            timers: Scheduler::new(),
            countdown: None,
            pending_advance: None,
        }
    }

    pub fn status(&self) -> RoundStatus
    {
        self.status
    }

    pub fn current_index(&self) -> usize
    {
        self.current
    }

    pub fn total(&self) -> usize
    {
        self.questions.len()
    }

    pub fn score(&self) -> u32
    {
        self.score
    }

    pub fn high_score(&self) -> u32
    {
        self.high_score.value()
    }

    pub fn remaining_secs(&self) -> u32
    {
        self.remaining_secs
    }

    pub fn answered(&self) -> bool
    {
        self.answered
    }

    pub fn choices(&self) -> &[String]
    {
        &self.choices
    }

    pub fn correct_index(&self) -> usize
    {
        self.correct_index
    }

    pub fn current_question(&self) -> Option<&Question>
    {
        match self.status {
            RoundStatus::Active => self.questions.get(self.current),
            _ => None,
        }
    }

    pub fn store(&self) -> &S
    {
        self.high_score.store()
    }

    pub fn begin(&mut self, questions: Vec<Question>) -> Result<Vec<RoundEvent>, GameError>
    {
        if questions.is_empty() {
            return Err(GameError::EmptyQuestionList);
        }
        for (index, question) in questions.iter().enumerate() {
            question
                .check()
                .map_err(|reason| GameError::MalformedQuestion { index, reason })?;
        }

        self.cancel_countdown();
        self.cancel_advance();
        info!("trivia: starting with {} questions", questions.len());
        self.questions = questions;
        self.current = 0;
        self.score = 0;
        self.status = RoundStatus::Active;
        Ok(self.present_current())
    }

    /// One countdown second. Does nothing once the question is resolved.
    pub fn tick(&mut self) -> Vec<RoundEvent>
    {
        if self.status != RoundStatus::Active || self.answered {
            return Vec::new();
        }
        self.cancel_countdown();
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        let mut events = vec![RoundEvent::Tick {
            remaining_secs: self.remaining_secs,
        }];

        if self.remaining_secs == 0 {
            debug!("trivia: time up on question {}", self.current + 1);
            self.answered = true;
            events.push(RoundEvent::TimeUp {
                correct_index: self.correct_index,
            });
            self.schedule_advance();
        } else {
            self.countdown = Some(self.timers.schedule_once(TICK_MS, Timer::Tick));
        }
        events
    }

    /// Answers the active question with the choice at `choice` in display
    /// order.
    pub fn submit_answer(&mut self, choice: usize) -> Vec<RoundEvent>
    {
        if self.status != RoundStatus::Active || self.answered || choice >= self.choices.len() {
            debug!("trivia: answer {choice} ignored");
            return Vec::new();
        }
        self.answered = true;
        self.cancel_countdown();

        let elapsed = QUESTION_SECS.saturating_sub(self.remaining_secs);
        let correct = choice == self.correct_index;
        let points = if correct { points_for(elapsed) } else { 0 };
        self.score += points;
        debug!(
            "trivia: question {} answered after {elapsed}s, correct={correct}, +{points}",
            self.current + 1
        );

        self.schedule_advance();
        vec![RoundEvent::Answered {
            choice,
            correct,
            correct_index: self.correct_index,
            points,
            score: self.score,
        }]
    }

    pub fn advance_clock(&mut self, now_ms: u64) -> Vec<RoundEvent>
    {
        let mut events = Vec::new();
        while let Some(timer) = self.timers.pop_due(now_ms) {
            match timer {
                Timer::Tick => {
                    self.countdown = None;
                    events.extend(self.tick());
                }
                Timer::Advance => {
                    self.pending_advance = None;
                    events.extend(self.advance_question());
                }
            }
        }
        self.timers.settle(now_ms);
        events
    }

    fn present_current(&mut self) -> Vec<RoundEvent>
    {
        let Some(question) = self.questions.get(self.current) else {
            return self.finalize();
        };

        let mut order: Vec<Option<&String>> = std::iter::once(None)
            .chain(question.distractors.iter().map(Some))
            .collect();
        order.shuffle(&mut self.rng);
        let correct_index = order.iter().position(Option::is_none).unwrap_or(0);
        let choices: Vec<String> = order
            .into_iter()
            .map(|answer| answer.unwrap_or(&question.correct_answer).clone())
            .collect();
        let prompt = question.prompt.clone();

        self.choices = choices;
        self.correct_index = correct_index;
        self.remaining_secs = QUESTION_SECS;
        self.answered = false;
        self.cancel_countdown();
        self.countdown = Some(self.timers.schedule_once(TICK_MS, Timer::Tick));

        vec![RoundEvent::QuestionPresented {
            index: self.current,
            total: self.questions.len(),
            prompt,
            choices: self.choices.clone(),
            remaining_secs: self.remaining_secs,
        }]
    }

    fn advance_question(&mut self) -> Vec<RoundEvent>
    {
        if self.status != RoundStatus::Active {
            return Vec::new();
        }
        self.current += 1;
        if self.current < self.questions.len() {
            self.present_current()
        } else {
            self.finalize()
        }
    }

    fn finalize(&mut self) -> Vec<RoundEvent>
    {
        self.cancel_countdown();
        self.cancel_advance();
        self.status = RoundStatus::Finished;
        self.answered = true;
        let new_high_score = self.high_score.submit(self.score);
        info!(
            "trivia: finished with {} points (best {})",
            self.score,
            self.high_score.value()
        );
        vec![RoundEvent::Finished {
            score: self.score,
            high_score: self.high_score.value(),
            new_high_score,
        }]
    }

    fn schedule_advance(&mut self)
    {
        if self.pending_advance.is_some() {
            return;
        }
        self.pending_advance = Some(self.timers.schedule_once(ADVANCE_DELAY_MS, Timer::Advance));
    }

    fn cancel_countdown(&mut self)
    {
        if let Some(id) = self.countdown.take() {
            self.timers.cancel(id);
        }
    }

    fn cancel_advance(&mut self)
    {
        if let Some(id) = self.pending_advance.take() {
            self.timers.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::store::MemoryScoreStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn questions(n: usize) -> Vec<Question>
    {
        (0..n)
            .map(|i| {
                Question::new(
                    format!("Question {i}?"),
                    format!("right {i}"),
                    [format!("wrong a{i}"), format!("wrong b{i}"), format!("wrong c{i}")],
                )
            })
            .collect()
    }

    fn engine() -> RoundEngine<StdRng, MemoryScoreStore>
    {
        RoundEngine::new(StdRng::seed_from_u64(7), MemoryScoreStore::new())
    }

    fn wrong_choice(engine: &RoundEngine<StdRng, MemoryScoreStore>) -> usize
    {
        (engine.correct_index() + 1) % engine.choices().len()
    }

    #[test]
    fn points_decay_and_floor_at_zero()
    {
        assert_eq!(points_for(0), 500);
        assert_eq!(points_for(1), 475);
        assert_eq!(points_for(14), 150);
        assert_eq!(points_for(19), 25);
        assert_eq!(points_for(20), 0);
        assert_eq!(points_for(300), 0);
        assert_eq!(points_for(u32::MAX), 0);

        let mut previous = points_for(0);
        for elapsed in 1..40 {
            let points = points_for(elapsed);
            assert!(points <= previous);
            previous = points;
        }
    }

    #[test]
    fn empty_question_list_is_rejected()
    {
        let mut engine = engine();
        assert_eq!(engine.begin(Vec::new()), Err(GameError::EmptyQuestionList));
        assert_eq!(engine.status(), RoundStatus::Idle);
    }

    #[test]
    fn malformed_question_is_rejected()
    {
        let mut engine = engine();
        let mut list = questions(2);
        list[1].distractors = vec!["same".into(), "same".into()];
        assert!(matches!(
            engine.begin(list),
            Err(GameError::MalformedQuestion { index: 1, .. })
        ));

        let mut list = questions(1);
        list[0].distractors.clear();
        assert!(matches!(
            engine.begin(list),
            Err(GameError::MalformedQuestion { index: 0, .. })
        ));
    }

    #[test]
    fn begin_presents_shuffled_choices()
    {
        let mut engine = engine();
        let events = engine.begin(questions(3)).unwrap();

        let RoundEvent::QuestionPresented {
            index,
            total,
            choices,
            remaining_secs,
            ..
        } = &events[0]
        else {
            panic!("expected a presented question, got {events:?}");
        };
        assert_eq!((*index, *total, *remaining_secs), (0, 3, QUESTION_SECS));
        assert_eq!(choices.len(), 4);
        assert_eq!(choices[engine.correct_index()], "right 0");
        let mut sorted = choices.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["right 0", "wrong a0", "wrong b0", "wrong c0"]);
    }

    #[test]
    fn every_position_gets_the_correct_answer_eventually()
    {
        let mut engine = engine();
        engine.begin(questions(60)).unwrap();
        let mut seen = [false; 4];
        let mut now = 0;
        while engine.status() == RoundStatus::Active {
            seen[engine.correct_index()] = true;
            engine.submit_answer(0);
            now += ADVANCE_DELAY_MS;
            engine.advance_clock(now);
        }
        assert_eq!(seen, [true; 4]);
    }

    #[test]
    fn instant_correct_answers_score_full_points()
    {
        let mut engine = engine();
        let n = 5;
        engine.begin(questions(n)).unwrap();
        let mut now = 0;
        for _ in 0..n {
            engine.submit_answer(engine.correct_index());
            now += ADVANCE_DELAY_MS;
            engine.advance_clock(now);
        }
        assert_eq!(engine.status(), RoundStatus::Finished);
        assert_eq!(engine.score(), BASE_POINTS * n as u32);
    }

    #[test]
    fn slower_answers_score_less()
    {
        let mut engine = engine();
        engine.begin(questions(1)).unwrap();
        let events = engine.advance_clock(4 * TICK_MS);
        assert_eq!(events.len(), 4);
        assert_eq!(engine.remaining_secs(), 11);

        let events = engine.submit_answer(engine.correct_index());
        assert_eq!(
            events,
            vec![RoundEvent::Answered {
                choice: engine.correct_index(),
                correct: true,
                correct_index: engine.correct_index(),
                points: 400,
                score: 400,
            }]
        );
    }

    #[test]
    fn wrong_answer_scores_nothing()
    {
        let mut engine = engine();
        engine.begin(questions(1)).unwrap();
        let choice = wrong_choice(&engine);
        let events = engine.submit_answer(choice);

        assert!(matches!(
            events.as_slice(),
            [RoundEvent::Answered { correct: false, points: 0, score: 0, .. }]
        ));
    }

    #[test]
    fn only_the_first_answer_counts()
    {
        let mut engine = engine();
        engine.begin(questions(2)).unwrap();
        engine.submit_answer(wrong_choice(&engine));
        assert!(engine.submit_answer(engine.correct_index()).is_empty());
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.current_index(), 0);
    }

    #[test]
    fn out_of_range_choice_is_ignored()
    {
        let mut engine = engine();
        engine.begin(questions(1)).unwrap();
        assert!(engine.submit_answer(4).is_empty());
        assert!(!engine.answered());
    }

    #[test]
    fn countdown_stops_after_answer()
    {
        let mut engine = engine();
        engine.begin(questions(2)).unwrap();
        engine.advance_clock(2 * TICK_MS);
        engine.submit_answer(engine.correct_index());

        let events = engine.advance_clock(2 * TICK_MS + ADVANCE_DELAY_MS - 1);
        assert!(events.is_empty());
        assert_eq!(engine.remaining_secs(), 13);
    }

    #[test]
    fn timeout_resolves_exactly_once()
    {
        let mut engine = engine();
        engine.begin(questions(2)).unwrap();
        let timeout_at = QUESTION_SECS as u64 * TICK_MS;

        let events = engine.advance_clock(timeout_at);
        let time_ups = events
            .iter()
            .filter(|event| matches!(event, RoundEvent::TimeUp { .. }))
            .count();
        assert_eq!(time_ups, 1);
        assert!(engine.answered());
        assert_eq!(engine.remaining_secs(), 0);
        assert_eq!(engine.score(), 0);

        assert!(engine.tick().is_empty());
        assert!(engine.submit_answer(engine.correct_index()).is_empty());
        assert!(engine.advance_clock(timeout_at + ADVANCE_DELAY_MS - 1).is_empty());
        assert_eq!(engine.current_index(), 0);

        let events = engine.advance_clock(timeout_at + ADVANCE_DELAY_MS);
        assert!(matches!(
            events.as_slice(),
            [RoundEvent::QuestionPresented { index: 1, .. }]
        ));
        assert!(!engine.answered());
        assert_eq!(engine.remaining_secs(), QUESTION_SECS);
    }

    #[test]
    fn cursor_reaches_the_end_after_one_resolution_per_question()
    {
        let n = 6;
        let mut engine = engine();
        engine.begin(questions(n)).unwrap();
        let mut resolutions = 0;
        let mut now = 0;

        while engine.status() == RoundStatus::Active {
            assert_eq!(engine.current_index(), resolutions);
            if resolutions % 2 == 0 {
                engine.submit_answer(0);
                now += ADVANCE_DELAY_MS;
            } else {
                now += QUESTION_SECS as u64 * TICK_MS + ADVANCE_DELAY_MS;
            }
            resolutions += 1;
            engine.advance_clock(now);
        }

        assert_eq!(resolutions, n);
        assert_eq!(engine.current_index(), n);
        assert!(engine.advance_clock(now + 60_000).is_empty());
        assert_eq!(engine.current_index(), n);
    }

    #[test]
    fn finishing_records_a_better_score()
    {
        let mut engine = RoundEngine::new(
            StdRng::seed_from_u64(1),
            MemoryScoreStore::with(HIGH_SCORE_KEY, 700),
        );
        assert_eq!(engine.high_score(), 700);
        engine.begin(questions(2)).unwrap();
        engine.submit_answer(engine.correct_index());
        engine.advance_clock(ADVANCE_DELAY_MS);
        engine.submit_answer(engine.correct_index());
        let events = engine.advance_clock(2 * ADVANCE_DELAY_MS);

        assert_eq!(
            events,
            vec![RoundEvent::Finished {
                score: 1_000,
                high_score: 1_000,
                new_high_score: true,
            }]
        );
        assert_eq!(engine.store().get(HIGH_SCORE_KEY), Some(1_000));
    }

    #[test]
    fn worse_score_leaves_high_score_alone()
    {
        let mut engine = RoundEngine::new(
            StdRng::seed_from_u64(1),
            MemoryScoreStore::with(HIGH_SCORE_KEY, 2_000),
        );
        engine.begin(questions(1)).unwrap();
        engine.submit_answer(engine.correct_index());
        let events = engine.advance_clock(ADVANCE_DELAY_MS);

        assert_eq!(
            events,
            vec![RoundEvent::Finished {
                score: 500,
                high_score: 2_000,
                new_high_score: false,
            }]
        );
        assert_eq!(engine.store().get(HIGH_SCORE_KEY), Some(2_000));
    }

    #[test]
    fn begin_again_after_finishing_resets_score()
    {
        let mut engine = engine();
        engine.begin(questions(1)).unwrap();
        engine.submit_answer(engine.correct_index());
        engine.advance_clock(ADVANCE_DELAY_MS);
        assert_eq!(engine.status(), RoundStatus::Finished);

        engine.begin(questions(2)).unwrap();
        assert_eq!(engine.status(), RoundStatus::Active);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.current_index(), 0);
        assert_eq!(engine.total(), 2);
    }
}
