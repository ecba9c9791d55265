//! Scripted prompt implementation for tests.

use crate::cli::util::Prompt;
use std::collections::VecDeque;

/// A `Prompt` that replays canned answers.
///
/// An empty-string answer means "press Enter" and resolves to the
/// prompt's default, mirroring terminal behavior. Questions asked are
/// recorded for assertions.
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    questions: Vec<String>,
    pauses: usize,
}

impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompt {
            answers: answers.iter().map(|answer| answer.to_string()).collect(),
            questions: Vec::new(),
            pauses: 0,
        }
    }

    /// Questions asked so far, in order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// How many times the flow paused for confirmation.
    pub fn pause_count(&self) -> usize {
        self.pauses
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, message: &str, default: Option<&str>) -> String {
        self.questions.push(message.to_string());
        match self.answers.pop_front() {
            Some(answer) if answer.is_empty() => default.unwrap_or("").to_string(),
            Some(answer) => answer,
            None => default.unwrap_or("").to_string(),
        }
    }

    fn pause(&mut self, _message: &str) {
        self.pauses += 1;
    }
}
