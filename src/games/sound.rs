use super::term::TerminalGuard;
use log::trace;

/// Fire-and-forget sound cues, named after what they accompany
/// (`"red"`, `"wrong"`, ...).
pub trait Sound
{
    fn play(&mut self, term: &mut TerminalGuard, cue: &str);
}

/// Rings the terminal bell for error cues. Terminals have nothing better for
/// the colour tones, so those stay silent.
pub struct Bell;

impl Sound for Bell
{
    fn play(&mut self, term: &mut TerminalGuard, cue: &str)
    {
        trace!("sound: {cue}");
        if cue == "wrong" {
            term.bell();
        }
    }
}

pub struct Muted;

impl Sound for Muted
{
    fn play(&mut self, _term: &mut TerminalGuard, cue: &str)
    {
        trace!("sound (muted): {cue}");
    }
}
