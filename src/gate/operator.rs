//! Operator interaction.
//!
//! The gate never reads stdin directly. It talks to an [`Operator`], which the
//! binary backs with the terminal and tests back with scripted answers.

use std::collections::VecDeque;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Synchronous yes/no decision provider.
pub trait Operator {
    /// Show an informational message.
    fn notify(&mut self, message: &str);

    /// Ask a yes/no question. Blocks until answered; there is no timeout.
    fn confirm(&mut self, question: &str) -> bool;
}

/// Whether an answer counts as "yes".
///
/// Only `y` and `yes` are affirmative, case-insensitive, ignoring surrounding
/// whitespace. Everything else, including an empty answer, is a decline.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Line-based operator over a reader and a writer.
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl ConsoleOperator<StdinLock<'static>, Stdout> {
    /// Operator on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            assume_yes: false,
        }
    }

    /// Answer every question with "yes" without reading input.
    pub fn assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    /// Consume the operator and return its writer.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Operator for ConsoleOperator<R, W> {
    fn notify(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }

    fn confirm(&mut self, question: &str) -> bool {
        let _ = write!(self.output, "{} (y/N): ", question);
        if self.assume_yes {
            let _ = writeln!(self.output, "y");
            return true;
        }
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                let _ = writeln!(self.output);
                false
            }
            Ok(_) => is_affirmative(&line),
        }
    }
}

/// Operator that replays fixed answers and records what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<bool>,
    fallback: bool,
    messages: Vec<String>,
    questions: Vec<String>,
}

impl ScriptedOperator {
    /// Replay `answers` in order, then decline.
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Give the same answer to every question.
    pub fn always(answer: bool) -> Self {
        Self {
            fallback: answer,
            ..Self::default()
        }
    }

    /// Messages passed to [`Operator::notify`].
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Questions passed to [`Operator::confirm`].
    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl Operator for ScriptedOperator {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(self.fallback)
    }
}
