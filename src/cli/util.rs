use std::io::{self, BufRead, Write};

const RESET: &str = "\x1b[0m";

/// Color markup tags understood by `cli_message`.
const COLOR_TAGS: [(&str, &str); 4] = [
    ("red", "\x1b[31m"),
    ("green", "\x1b[32m"),
    ("yellow", "\x1b[33m"),
    ("cyan", "\x1b[36m"),
];

/// Translates `<red>..</red>`-style markup into ANSI escapes.
pub fn colorize(message: &str) -> String {
    let mut rendered = message.to_string();
    for (tag, code) in COLOR_TAGS {
        rendered = rendered.replace(&format!("<{}>", tag), code);
        rendered = rendered.replace(&format!("</{}>", tag), RESET);
    }
    rendered
}

/// Prints a status message to the terminal, honoring color markup.
pub fn cli_message(message: &str) {
    println!("{}", colorize(message));
}

/// Interactive prompting seam.
///
/// The suite-creation flow prompts for names and confirmations; routing
/// those through a trait keeps the flow testable with scripted answers
/// (see `cli::testing::ScriptedPrompt`).
pub trait Prompt {
    /// Asks a question and returns the answer.
    ///
    /// An empty answer resolves to `default` when one is given.
    fn ask(&mut self, message: &str, default: Option<&str>) -> String;

    /// Shows a message and waits for Enter.
    fn pause(&mut self, message: &str);
}

/// Prompt implementation reading from stdin.
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_line() -> String {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return String::new();
        }
        line.trim().to_string()
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, message: &str, default: Option<&str>) -> String {
        match default {
            Some(default) => print!("{} [{}]: ", colorize(message), default),
            None => print!("{}: ", colorize(message)),
        }
        let _ = io::stdout().flush();

        let answer = Self::read_line();
        if answer.is_empty() {
            default.unwrap_or("").to_string()
        } else {
            answer
        }
    }

    fn pause(&mut self, message: &str) {
        println!("{}", colorize(message));
        let _ = Self::read_line();
    }
}
