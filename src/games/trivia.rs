use super::simon::parse_seed;
use super::sound::{Bell, Muted, Sound};
use super::term::{self, Input, Rgb, TerminalGuard, fg};
use crate::engine::round::{RoundEngine, RoundEvent, RoundStatus};
use crate::opentdb::{Category, Difficulty, MAX_AMOUNT, OpenTdbClient, QuestionSource, QuizRequest};
use crate::store::{JsonScoreStore, MemoryScoreStore, ScoreStore};
use crossterm::event::KeyCode;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

const DEFAULT_AMOUNT: u32 = 10;

#[derive(Default)]
pub struct TriviaConfig
{
    amount: Option<u32>,
    category: Option<u32>,
    difficulty: Option<Option<Difficulty>>,
    seed: Option<u64>,
    no_save: bool,
    mute: bool,
}

impl TriviaConfig
{
    pub fn from_args(args: &[String]) -> Result<Self, String>
    {
        let mut config = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (arg.as_str(), None),
            };
            let mut value = || {
                inline
                    .clone()
                    .or_else(|| iter.next().cloned())
                    .ok_or_else(|| format!("Expected value after {flag}"))
            };
            match flag {
                "--amount" => config.amount = Some(parse_amount(&value()?)?),
                "--category" => config.category = Some(parse_category_id(&value()?)?),
                "--difficulty" => config.difficulty = Some(parse_difficulty(&value()?)?),
                "--seed" => config.seed = Some(parse_seed(&value()?)?),
                "--no-save" if inline.is_none() => config.no_save = true,
                "--mute" if inline.is_none() => config.mute = true,
                _ => return Err(format!("Unknown trivia option '{arg}'")),
            }
        }
        Ok(config)
    }
}

fn parse_amount(value: &str) -> Result<u32, String>
{
    let amount = value
        .trim()
        .parse::<u32>()
        .map_err(|_| "Amount must be a number".to_string())?;
    if amount == 0 {
        return Err("Amount must be at least 1".to_string());
    }
    Ok(amount.min(MAX_AMOUNT))
}

fn parse_category_id(value: &str) -> Result<u32, String>
{
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| "Category must be a numeric id".to_string())
}

/// `None` means any difficulty.
fn parse_difficulty(value: &str) -> Result<Option<Difficulty>, String>
{
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("any") {
        return Ok(None);
    }
    Difficulty::parse(value)
        .map(Some)
        .ok_or_else(|| format!("Unknown difficulty '{value}', use easy, medium or hard"))
}

/// Maps a menu entry to a category id. Empty input and `0` mean any.
fn parse_category_choice(input: &str, categories: &[Category]) -> Result<Option<u32>, String>
{
    let input = input.trim();
    if input.is_empty() || input == "0" {
        return Ok(None);
    }
    match input.parse::<usize>() {
        Ok(index) if index >= 1 && index <= categories.len() => Ok(Some(categories[index - 1].id)),
        _ => Err(format!("Pick a number between 0 and {}", categories.len())),
    }
}

pub fn run_with_config(config: TriviaConfig) -> Result<(), String>
{
    let source = OpenTdbClient::from_env().map_err(|err| err.to_string())?;
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    if config.no_save {
        play(&source, RoundEngine::new(rng, MemoryScoreStore::new()), &config)
    } else {
        let store = JsonScoreStore::open_default();
        debug!("high scores at {}", store.path().display());
        play(&source, RoundEngine::new(rng, store), &config)
    }
}

enum Next
{
    Setup,
    Quit,
}

fn play<Q, R, S>(
    source: &Q,
    mut engine: RoundEngine<R, S>,
    config: &TriviaConfig,
) -> Result<(), String>
where
    Q: QuestionSource,
    R: Rng,
    S: ScoreStore,
{
    let mut sound: Box<dyn Sound> = if config.mute {
        Box::new(Muted)
    } else {
        Box::new(Bell)
    };
    let clock = Instant::now();

    loop {
        println!();
        println!("KB Games - Trivia");
        println!("High Score: {}", engine.high_score());
        println!();

        let Some(request) = setup(source, config)? else {
            return Ok(());
        };

        println!("Fetching questions...");
        let events = match start_round(source, &mut engine, &request, clock) {
            Ok(events) => events,
            Err(err) => {
                println!("Error: {err}");
                let choice = term::prompt_line("Press Enter to return to setup, q to quit: ")?;
                if choice.eq_ignore_ascii_case("q") {
                    return Ok(());
                }
                continue;
            }
        };

        match run_quiz(&mut engine, events, clock, sound.as_mut())? {
            Next::Setup => continue,
            Next::Quit => return Ok(()),
        }
    }
}

fn elapsed_ms(clock: Instant) -> u64
{
    clock.elapsed().as_millis() as u64
}

/// Fetches one game's questions and hands them to the engine. The engine
/// clock is brought up to date after the fetch so the first countdown starts
/// when the question is shown.
fn start_round<Q, R, S>(
    source: &Q,
    engine: &mut RoundEngine<R, S>,
    request: &QuizRequest,
    clock: Instant,
) -> Result<Vec<RoundEvent>, String>
where
    Q: QuestionSource,
    R: Rng,
    S: ScoreStore,
{
    let questions = source
        .fetch_questions(request)
        .map_err(|err| err.to_string())?;
    engine.advance_clock(elapsed_ms(clock));
    engine.begin(questions).map_err(|err| err.to_string())
}

/// Line-based setup. Returns `None` when the player quits.
fn setup<Q: QuestionSource>(
    source: &Q,
    config: &TriviaConfig,
) -> Result<Option<QuizRequest>, String>
{
    let category = match config.category {
        Some(id) => Some(id),
        None => match source.fetch_categories() {
            Ok(categories) => {
                println!("Categories:");
                println!("  {:>2}. Any category", 0);
                for (idx, category) in categories.iter().enumerate() {
                    println!("  {:>2}. {}", idx + 1, category.name);
                }
                loop {
                    let input = term::prompt_line("Category (default 0, q to quit): ")?;
                    if input.eq_ignore_ascii_case("q") {
                        return Ok(None);
                    }
                    match parse_category_choice(&input, &categories) {
                        Ok(category) => break category,
                        Err(err) => println!("{err}"),
                    }
                }
            }
            Err(err) => {
                println!("Could not load categories ({err}). Using any category.");
                None
            }
        },
    };

    let amount = match config.amount {
        Some(amount) => amount,
        None => loop {
            let input = term::prompt_line(&format!(
                "Number of questions (1-{MAX_AMOUNT}, default {DEFAULT_AMOUNT}): "
            ))?;
            if input.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            if input.is_empty() {
                break DEFAULT_AMOUNT;
            }
            match parse_amount(&input) {
                Ok(amount) => break amount,
                Err(err) => println!("{err}"),
            }
        },
    };

    let difficulty = match config.difficulty {
        Some(difficulty) => difficulty,
        None => loop {
            let input = term::prompt_line("Difficulty (any/easy/medium/hard, default any): ")?;
            if input.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            match parse_difficulty(&input) {
                Ok(difficulty) => break difficulty,
                Err(err) => println!("{err}"),
            }
        },
    };

    Ok(Some(QuizRequest {
        amount,
        category,
        difficulty,
    }))
}

#[derive(Default)]
struct QuizView
{
    index: usize,
    total: usize,
    prompt: String,
    choices: Vec<String>,
    remaining_secs: u32,
    score: u32,
    high_score: u32,
    chosen: Option<usize>,
    reveal: Option<usize>,
    result: Option<String>,
    timed_out: bool,
    finished: Option<(u32, u32, bool)>,
}

impl QuizView
{
    fn apply(&mut self, event: &RoundEvent)
    {
        match event {
            RoundEvent::QuestionPresented {
                index,
                total,
                prompt,
                choices,
                remaining_secs,
            } => {
                self.index = *index;
                self.total = *total;
                self.prompt = prompt.clone();
                self.choices = choices.clone();
                self.remaining_secs = *remaining_secs;
                self.chosen = None;
                self.reveal = None;
                self.result = None;
                self.timed_out = false;
            }
            RoundEvent::Tick { remaining_secs } => self.remaining_secs = *remaining_secs,
            RoundEvent::Answered {
                choice,
                correct,
                correct_index,
                points,
                score,
            } => {
                self.chosen = Some(*choice);
                self.reveal = Some(*correct_index);
                self.score = *score;
                self.result = Some(if *correct {
                    format!("Correct! + {points} Points")
                } else {
                    let answer = self.choices.get(*correct_index).cloned().unwrap_or_default();
                    format!("Wrong! The correct answer was: {answer}")
                });
            }
            RoundEvent::TimeUp { correct_index } => {
                self.timed_out = true;
                self.reveal = Some(*correct_index);
                self.result = Some("Time's up! 0 points for this question.".to_string());
            }
            RoundEvent::Finished {
                score,
                high_score,
                new_high_score,
            } => {
                self.score = *score;
                self.high_score = *high_score;
                self.finished = Some((*score, *high_score, *new_high_score));
            }
        }
    }

    fn render(&self, category: Option<&str>, difficulty: Option<&str>) -> Vec<String>
    {
        let green = Rgb::new(0, 200, 80);
        let red = Rgb::new(230, 50, 50);
        let mut lines = Vec::new();
        lines.push("KB Games - Trivia".to_string());
        let mut progress = format!("Question {}/{}", self.index + 1, self.total);
        if let Some(category) = category {
            progress.push_str(&format!("  {category}"));
        }
        if let Some(difficulty) = difficulty {
            progress.push_str(&format!("  ({difficulty})"));
        }
        lines.push(progress);
        lines.push(if self.timed_out {
            "Time's up!".to_string()
        } else {
            format!("Time Remaining: {}s", self.remaining_secs)
        });
        lines.push(format!(
            "Current Score: {}  High Score: {}",
            self.score, self.high_score
        ));
        lines.push(String::new());
        lines.push(self.prompt.clone());
        lines.push(String::new());

        for (idx, choice) in self.choices.iter().enumerate() {
            let text = format!("  {}. {}", idx + 1, choice);
            let line = if self.reveal == Some(idx) {
                fg(green, &text)
            } else if self.chosen == Some(idx) {
                fg(red, &text)
            } else {
                text
            };
            lines.push(line);
        }

        lines.push(String::new());
        lines.push(self.result.clone().unwrap_or_default());
        lines.push(format!(
            "Press 1-{} to answer. Esc quits.",
            self.choices.len().max(1)
        ));
        lines
    }

    fn render_summary(&self) -> Vec<String>
    {
        let (score, high_score, new_high_score) = self
            .finished
            .unwrap_or((self.score, self.high_score, false));
        let mut lines = Vec::new();
        lines.push("Quiz Finished!".to_string());
        lines.push(String::new());
        lines.push(format!("Your final score is {score}"));
        lines.push(format!("High Score: {high_score}"));
        if new_high_score {
            lines.push(fg(Rgb::new(255, 215, 0), "New high score!"));
        }
        lines.push(String::new());
        lines.push("Press R to restart, SPACE to exit.".to_string());
        lines
    }
}

fn run_quiz<R: Rng, S: ScoreStore>(
    engine: &mut RoundEngine<R, S>,
    opening: Vec<RoundEvent>,
    clock: Instant,
    sound: &mut dyn Sound,
) -> Result<Next, String>
{
    let mut term = TerminalGuard::enter().map_err(|err| err.to_string())?;
    let mut view = QuizView {
        high_score: engine.high_score(),
        ..QuizView::default()
    };
    let mut pending = opening;
    let mut last_tick: Option<Instant> = None;

    loop {
        for event in pending.drain(..) {
            match &event {
                RoundEvent::Answered { correct: false, .. } | RoundEvent::TimeUp { .. } => {
                    sound.play(&mut term, "wrong");
                }
                RoundEvent::Answered { correct: true, .. } => sound.play(&mut term, "correct"),
                _ => {}
            }
            view.apply(&event);
        }

        if engine.status() == RoundStatus::Finished {
            break;
        }

        if last_tick.is_none_or(|tick| tick.elapsed() >= Duration::from_millis(term::TICK_MS)) {
            let question = engine.current_question();
            let category = question.and_then(|q| q.category.as_deref());
            let difficulty = question.and_then(|q| q.difficulty.as_deref());
            term.draw(&view.render(category, difficulty))?;
            last_tick = Some(Instant::now());
        }

        for input in term::poll_keys()? {
            match input {
                Input::Quit => return Ok(Next::Quit),
                Input::Key(KeyCode::Char(ch)) => {
                    if let Some(digit) = ch.to_digit(10).filter(|d| *d >= 1) {
                        pending.extend(engine.submit_answer(digit as usize - 1));
                    }
                }
                Input::Key(_) => {}
            }
        }
        pending.extend(engine.advance_clock(elapsed_ms(clock)));

        std::thread::sleep(Duration::from_millis(1));
    }

    term.draw(&view.render_summary())?;
    match term::wait_for_key(&['r', ' '])? {
        Some('r') => Ok(Next::Setup),
        _ => Ok(Next::Quit),
    }
}
