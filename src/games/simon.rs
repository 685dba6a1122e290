use super::sound::{Bell, Muted, Sound};
use super::term::{self, Input, Rgb, TerminalGuard, bg};
use crate::engine::sequence::{Phase, SequenceEngine, SequenceEvent, Symbol};
use crossterm::event::KeyCode;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

const FLASH_MS: u64 = 300;
const PRESS_MS: u64 = 100;
const GAME_OVER_MS: u64 = 200;
const PAD_WIDTH: usize = 14;
const PAD_HEIGHT: usize = 4;

#[derive(Default)]
pub struct SimonConfig
{
    seed: Option<u64>,
    mute: bool,
}

impl SimonConfig
{
    pub fn from_args(args: &[String]) -> Result<Self, String>
    {
        let mut config = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--seed" {
                let value = iter
                    .next()
                    .ok_or_else(|| "Expected value after --seed".to_string())?;
                config.seed = Some(parse_seed(value)?);
            } else if let Some(rest) = arg.strip_prefix("--seed=") {
                config.seed = Some(parse_seed(rest)?);
            } else if arg == "--mute" {
                config.mute = true;
            } else {
                return Err(format!("Unknown simon option '{arg}'"));
            }
        }
        Ok(config)
    }
}

pub fn parse_seed(value: &str) -> Result<u64, String>
{
    value
        .parse::<u64>()
        .map_err(|_| "Seed must be a non-negative integer".to_string())
}

/// What the screen shows besides the engine state.
#[derive(Default)]
struct Lights
{
    flash: Option<(Symbol, u64)>,
    pressed: Option<(Symbol, u64)>,
    game_over_until: u64,
}

impl Lights
{
    fn lit(&self, symbol: Symbol, now: u64) -> bool
    {
        let on = |light: Option<(Symbol, u64)>| {
            light.is_some_and(|(lit, until)| lit == symbol && now < until)
        };
        on(self.flash) || on(self.pressed)
    }
}

pub fn run_with_config(config: SimonConfig) -> Result<(), String>
{
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut sound: Box<dyn Sound> = if config.mute {
        Box::new(Muted)
    } else {
        Box::new(Bell)
    };
    let mut engine = SequenceEngine::new(rng);
    let mut lights = Lights::default();
    let mut best_level = 0u32;

    let mut term = TerminalGuard::enter().map_err(|err| err.to_string())?;
    let clock = Instant::now();
    let mut last_tick: Option<Instant> = None;

    loop {
        let now = clock.elapsed().as_millis() as u64;
        let mut events = Vec::new();

        for input in term::poll_keys()? {
            match input {
                Input::Quit => return Ok(()),
                Input::Key(code) => {
                    let produced = handle_key(&mut engine, code, now >= lights.game_over_until);
                    if produced.iter().any(|event| matches!(event, SequenceEvent::Failed { .. })) {
                        lights.game_over_until = now + GAME_OVER_MS;
                    }
                    events.extend(produced);
                }
            }
        }
        events.extend(engine.advance_clock(now));

        for event in &events {
            match event {
                SequenceEvent::Presented { level, pattern } => {
                    best_level = best_level.max(*level);
                    if let Some(&newest) = pattern.last() {
                        lights.flash = Some((newest, now + FLASH_MS));
                        sound.play(&mut term, newest.name());
                    }
                }
                SequenceEvent::Echo(symbol) => {
                    lights.pressed = Some((*symbol, now + PRESS_MS));
                    sound.play(&mut term, symbol.name());
                }
                SequenceEvent::RoundComplete { .. } => {}
                SequenceEvent::Failed { got, .. } => {
                    lights.pressed = Some((*got, now + PRESS_MS));
                    sound.play(&mut term, "wrong");
                }
            }
        }

        if last_tick.is_none_or(|tick| tick.elapsed() >= Duration::from_millis(term::TICK_MS)) {
            term.draw(&render(&engine, &lights, best_level, now))?;
            last_tick = Some(Instant::now());
        }

        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Restart keys are ignored after a failure until `restart_ready`, so a quick
/// double press cannot skip the game over screen.
fn handle_key<R: rand::Rng>(
    engine: &mut SequenceEngine<R>,
    code: KeyCode,
    restart_ready: bool,
) -> Vec<SequenceEvent>
{
    match engine.phase() {
        Phase::AwaitingStart => engine.start(),
        Phase::Failed if restart_ready => {
            engine.reset();
            engine.start()
        }
        Phase::Failed => Vec::new(),
        Phase::AwaitingInput => match code {
            KeyCode::Char(ch) => match Symbol::from_key(ch) {
                Some(symbol) => engine.submit(symbol),
                None => Vec::new(),
            },
            _ => Vec::new(),
        },
        Phase::Presenting => Vec::new(),
    }
}

fn title<R: rand::Rng>(engine: &SequenceEngine<R>) -> String
{
    match engine.phase() {
        Phase::AwaitingStart => "Press any key to start".to_string(),
        Phase::Failed => "Game Over, press any key to restart".to_string(),
        Phase::Presenting if engine.advance_pending() => {
            format!("Level {} complete", engine.level())
        }
        Phase::Presenting | Phase::AwaitingInput => format!("Level {}", engine.level()),
    }
}

fn pad_color(symbol: Symbol) -> Rgb
{
    match symbol {
        Symbol::Red => Rgb::new(230, 40, 40),
        Symbol::Blue => Rgb::new(40, 90, 240),
        Symbol::Green => Rgb::new(40, 200, 70),
        Symbol::Yellow => Rgb::new(240, 210, 40),
    }
}

fn pad_row(symbols: [Symbol; 2], lights: &Lights, now: u64, label_row: bool) -> String
{
    let mut row = String::from("  ");
    for symbol in symbols {
        let color = if lights.lit(symbol, now) {
            pad_color(symbol)
        } else {
            pad_color(symbol).dim()
        };
        let text = if label_row {
            let label = format!("{} ({})", symbol.name(), key_hint(symbol));
            format!("{:^width$}", label, width = PAD_WIDTH)
        } else {
            " ".repeat(PAD_WIDTH)
        };
        row.push_str(&bg(color, &text));
        row.push_str("  ");
    }
    row
}

fn key_hint(symbol: Symbol) -> char
{
    match symbol {
        Symbol::Red => 'r',
        Symbol::Blue => 'b',
        Symbol::Green => 'g',
        Symbol::Yellow => 'y',
    }
}

fn render<R: rand::Rng>(
    engine: &SequenceEngine<R>,
    lights: &Lights,
    best_level: u32,
    now: u64,
) -> Vec<String>
{
    let mut lines = Vec::new();
    let heading = title(engine);
    if now < lights.game_over_until {
        lines.push(bg(Rgb::new(200, 0, 0), &format!(" {heading} ")));
    } else {
        lines.push(heading);
    }
    lines.push(format!(
        "Progress: {}/{}  Best level: {}",
        engine.input().len(),
        engine.pattern().len(),
        best_level
    ));
    lines.push(String::new());

    for pair in [[Symbol::Green, Symbol::Red], [Symbol::Yellow, Symbol::Blue]] {
        for line in 0..PAD_HEIGHT {
            lines.push(pad_row(pair, lights, now, line == PAD_HEIGHT / 2));
        }
        lines.push(String::new());
    }

    lines.push("Repeat the pattern with r/g/b/y or 1-4. Esc quits.".to_string());
    lines
}
