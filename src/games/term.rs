use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, BufRead, Stdout, Write};
use std::time::Duration;

pub const TICK_MS: u64 = 33;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rgb
{
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb
{
    pub const fn new(r: u8, g: u8, b: u8) -> Self
    {
        Self { r, g, b }
    }

    pub fn dim(self) -> Self
    {
        Self {
            r: self.r / 4,
            g: self.g / 4,
            b: self.b / 4,
        }
    }
}

pub fn fg(color: Rgb, text: &str) -> String
{
    format!("\x1b[38;2;{};{};{}m{}\x1b[0m", color.r, color.g, color.b, text)
}

pub fn bg(color: Rgb, text: &str) -> String
{
    format!("\x1b[48;2;{};{};{}m{}\x1b[0m", color.r, color.g, color.b, text)
}

/// Raw mode and the alternate screen for as long as it lives.
pub struct TerminalGuard
{
    stdout: Stdout,
}

impl TerminalGuard
{
    pub fn enter() -> io::Result<Self>
    {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, Hide)?;
        Ok(Self { stdout })
    }

    pub fn draw(&mut self, lines: &[String]) -> Result<(), String>
    {
        let output = format!("{}\r\n", lines.join("\r\n"));
        queue!(self.stdout, MoveTo(0, 0), Clear(ClearType::All))
            .map_err(|err| err.to_string())?;
        self.stdout
            .write_all(output.as_bytes())
            .map_err(|err| err.to_string())?;
        self.stdout.flush().map_err(|err| err.to_string())?;
        Ok(())
    }

    pub fn bell(&mut self)
    {
        let _ = self.stdout.write_all(b"\x07");
        let _ = self.stdout.flush();
    }
}

impl Drop for TerminalGuard
{
    fn drop(&mut self)
    {
        let _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

pub enum Input
{
    Quit,
    Key(KeyCode),
}

/// Drains pending key presses without blocking.
pub fn poll_keys() -> Result<Vec<Input>, String>
{
    let mut keys = Vec::new();
    while event::poll(Duration::from_millis(0)).map_err(|err| err.to_string())? {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read().map_err(|err| err.to_string())?
        {
            if kind == KeyEventKind::Release {
                continue;
            }
            match code {
                KeyCode::Esc => keys.push(Input::Quit),
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    keys.push(Input::Quit)
                }
                code => keys.push(Input::Key(code)),
            }
        }
    }
    Ok(keys)
}

/// Blocks until one of `wanted` is pressed, returning it. Esc returns `None`.
pub fn wait_for_key(wanted: &[char]) -> Result<Option<char>, String>
{
    while event::poll(Duration::from_millis(0)).map_err(|err| err.to_string())? {
        let _ = event::read().map_err(|err| err.to_string())?;
    }

    loop {
        if event::poll(Duration::from_millis(50)).map_err(|err| err.to_string())? {
            if let Event::Key(KeyEvent { code, kind, .. }) =
                event::read().map_err(|err| err.to_string())?
            {
                if kind == KeyEventKind::Release {
                    continue;
                }
                match code {
                    KeyCode::Esc => return Ok(None),
                    KeyCode::Char(ch) if wanted.contains(&ch.to_ascii_lowercase()) => {
                        return Ok(Some(ch.to_ascii_lowercase()))
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Line prompt for setup screens, outside raw mode.
pub fn prompt_line(label: &str) -> Result<String, String>
{
    print!("{label}");
    io::stdout()
        .flush()
        .map_err(|err| format!("Failed to flush stdout: {err}"))?;
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|err| format!("Failed to read input: {err}"))?;
    Ok(input.trim().to_string())
}
