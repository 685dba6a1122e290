//! Memory-sequence ("Simon") state machine.
//!
//! The engine owns the growing pattern, the player's input for the current
//! round and the level. Every call returns the events it emitted; calls that
//! are not valid in the current phase are ignored and return nothing.

use super::scheduler::{Scheduler, TimerId};
use log::debug;
use rand::Rng;

pub const ADVANCE_DELAY_MS: u64 = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol
{
    Red,
    Blue,
    Green,
    Yellow,
}

impl Symbol
{
    pub const ALL: [Symbol; 4] = [Symbol::Red, Symbol::Blue, Symbol::Green, Symbol::Yellow];

    pub fn name(self) -> &'static str
    {
        match self {
            Symbol::Red => "red",
            Symbol::Blue => "blue",
            Symbol::Green => "green",
            Symbol::Yellow => "yellow",
        }
    }

    pub fn from_key(ch: char) -> Option<Self>
    {
        match ch.to_ascii_lowercase() {
            'r' | '1' => Some(Symbol::Red),
            'b' | '2' => Some(Symbol::Blue),
            'g' | '3' => Some(Symbol::Green),
            'y' | '4' => Some(Symbol::Yellow),
            _ => None,
        }
    }

    fn random(rng: &mut impl Rng) -> Self
    {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase
{
    AwaitingStart,
    Presenting,
    AwaitingInput,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceEvent
{
    /// A new round began; the front end plays the pattern back.
    Presented { level: u32, pattern: Vec<Symbol> },
    /// A correct press, for sound and press feedback.
    Echo(Symbol),
    RoundComplete { level: u32 },
    Failed { level: u32, expected: Symbol, got: Symbol },
}

#[derive(Debug)]
enum Deferred
{
    AdvanceRound,
}

pub struct SequenceEngine<R>
{
    rng: R,
    pattern: Vec<Symbol>,
    input: Vec<Symbol>,
    level: u32,
    phase: Phase,
    timers: Scheduler<Deferred>,
    pending_advance: Option<TimerId>,
}

impl<R: Rng> SequenceEngine<R>
{
    pub fn new(rng: R) -> Self
    {
        Self {
            rng,
            pattern: Vec::new(),
            input: Vec::new(),
            level: 0,
            phase: Phase::AwaitingStart,
            timers: Scheduler::new(),
            pending_advance: None,
        }
    }

    pub fn phase(&self) -> Phase
    {
        self.phase
    }

    pub fn level(&self) -> u32
    {
        self.level
    }

    pub fn pattern(&self) -> &[Symbol]
    {
        &self.pattern
    }

    pub fn input(&self) -> &[Symbol]
    {
        &self.input
    }

    pub fn advance_pending(&self) -> bool
    {
        self.pending_advance.is_some()
    }

    pub fn start(&mut self) -> Vec<SequenceEvent>
    {
        if self.phase != Phase::AwaitingStart {
            debug!("simon: start ignored in {:?}", self.phase);
            return Vec::new();
        }
        self.level = 0;
        self.pattern.clear();
        self.input.clear();
        self.phase = Phase::Presenting;
        self.advance_round()
    }

    /// Leaves `Failed` so the next `start` begins a fresh game.
    pub fn reset(&mut self) -> bool
    {
        if self.phase != Phase::Failed {
            return false;
        }
        self.cancel_pending();
        self.level = 0;
        self.pattern.clear();
        self.input.clear();
        self.phase = Phase::AwaitingStart;
        true
    }

    pub fn submit(&mut self, symbol: Symbol) -> Vec<SequenceEvent>
    {
        if self.phase != Phase::AwaitingInput {
            debug!("simon: {} ignored in {:?}", symbol.name(), self.phase);
            return Vec::new();
        }

        self.input.push(symbol);
        let index = self.input.len() - 1;
        let expected = self.pattern[index];
        if expected != symbol {
            debug!(
                "simon: expected {} got {} at level {}",
                expected.name(),
                symbol.name(),
                self.level
            );
            self.phase = Phase::Failed;
            self.cancel_pending();
            return vec![SequenceEvent::Failed {
                level: self.level,
                expected,
                got: symbol,
            }];
        }

        let mut events = vec![SequenceEvent::Echo(symbol)];
        if self.input.len() == self.pattern.len() {
            self.phase = Phase::Presenting;
            if self.pending_advance.is_none() {
                let id = self.timers.schedule_once(ADVANCE_DELAY_MS, Deferred::AdvanceRound);
                self.pending_advance = Some(id);
            }
            events.push(SequenceEvent::RoundComplete { level: self.level });
        }
        events
    }

    /// Fires the deferred round advance once its delay has passed.
    pub fn advance_clock(&mut self, now_ms: u64) -> Vec<SequenceEvent>
    {
        let mut events = Vec::new();
        while let Some(deferred) = self.timers.pop_due(now_ms) {
            match deferred {
                Deferred::AdvanceRound => {
                    self.pending_advance = None;
                    events.extend(self.advance_round());
                }
            }
        }
        self.timers.settle(now_ms);
        events
    }

    fn advance_round(&mut self) -> Vec<SequenceEvent>
    {
        self.pattern.push(Symbol::random(&mut self.rng));
        self.level += 1;
        self.input.clear();
        self.phase = Phase::Presenting;
        debug!("simon: level {}", self.level);
        let presented = SequenceEvent::Presented {
            level: self.level,
            pattern: self.pattern.clone(),
        };
        self.phase = Phase::AwaitingInput;
        vec![presented]
    }

    fn cancel_pending(&mut self)
    {
        if let Some(id) = self.pending_advance.take() {
            self.timers.cancel(id);
        }
    }
}
