//! Mode selection: all tests, one test, or a numbered range.
//!
//! Selection happens once at startup. Preset values (flags or environment)
//! win; otherwise the operator is prompted, but only when stdin is a
//! terminal. Without a terminal and without a preset, the whole suite runs.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::catalog::TestId;
use crate::error::{Error, Result};

/// Choice that runs the whole catalog.
pub const CHOICE_ALL: &str = "1";
/// Choice that runs a single test.
pub const CHOICE_SINGLE: &str = "2";
/// Choice that runs a numbered range.
pub const CHOICE_RANGE: &str = "3";

/// What the run will execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Full catalog in dependency order.
    All,
    /// Exactly one test, dependencies ignored.
    Single(TestId),
    /// `test<NN>` for NN in `start..=end`, dependencies ignored.
    Range { start: u32, end: u32 },
}

/// Raw preset values gathered from flags and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeInputs {
    /// `1`, `2` or `3`.
    pub choice: Option<String>,
    /// Test name for choice 2.
    pub test_file: Option<String>,
    /// Range start for choice 3.
    pub start: Option<String>,
    /// Range end for choice 3.
    pub end: Option<String>,
}

/// Source of interactive answers.
pub trait Prompt {
    /// Shows `question` and returns the operator's answer.
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Prompts on stdout and reads answers from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", question)?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}

/// Returns true if an operator can answer prompts.
pub fn stdin_is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Resolves the run mode from presets, falling back to `prompt` if given.
///
/// Pass `None` for `prompt` when no interactive stream is available. A value
/// that cannot be obtained at all is [`Error::MissingInput`]; a value that
/// was obtained but is unusable is [`Error::InvalidSelection`].
pub fn select_mode(inputs: &ModeInputs, mut prompt: Option<&mut dyn Prompt>) -> Result<Mode> {
    let choice = match (&inputs.choice, prompt.as_deref_mut()) {
        (Some(choice), _) => choice.clone(),
        (None, Some(p)) => {
            p.ask("Choose an option (1: All tests, 2: Specific test, 3: Range): ")?
        }
        (None, None) => {
            tracing::debug!("no interactive input and no preset choice, running all tests");
            CHOICE_ALL.to_string()
        }
    };

    match choice.trim() {
        CHOICE_ALL => Ok(Mode::All),
        CHOICE_SINGLE => {
            let name = value_or_ask(
                &inputs.test_file,
                prompt,
                "Enter the name of the test file to run (e.g., 'test01.js'): ",
                "TEST_FILE is required for choice 2 in non-interactive mode",
            )?;
            let test = TestId::parse(&name).ok_or_else(|| {
                Error::InvalidSelection(format!("'{}' is not a test name", name))
            })?;
            Ok(Mode::Single(test))
        }
        CHOICE_RANGE => {
            let missing = "START_NUM and END_NUM are required for choice 3 in non-interactive mode";
            let start = value_or_ask(
                &inputs.start,
                prompt.as_deref_mut(),
                "Enter the starting test number (e.g., 2): ",
                missing,
            )?;
            let end = value_or_ask(
                &inputs.end,
                prompt,
                "Enter the ending test number (e.g., 5): ",
                missing,
            )?;
            Ok(Mode::Range {
                start: parse_number("start", &start)?,
                end: parse_number("end", &end)?,
            })
        }
        other => Err(Error::InvalidSelection(format!(
            "'{}' is not a valid choice, use 1 (all), 2 (single), or 3 (range)",
            other
        ))),
    }
}

fn value_or_ask<'p>(
    preset: &Option<String>,
    prompt: Option<&mut (dyn Prompt + 'p)>,
    question: &str,
    missing: &str,
) -> Result<String> {
    match (preset, prompt) {
        (Some(value), _) => Ok(value.trim().to_string()),
        (None, Some(p)) => p.ask(question),
        (None, None) => Err(Error::MissingInput(missing.to_string())),
    }
}

fn parse_number(label: &str, raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|_| {
        Error::InvalidSelection(format!(
            "{} number '{}' is not a non-negative integer",
            label, raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedPrompt {
        answers: VecDeque<String>,
        asked: Vec<String>,
    }

    impl ScriptedPrompt {
        fn answering(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn ask(&mut self, question: &str) -> Result<String> {
            self.asked.push(question.to_string());
            Ok(self.answers.pop_front().unwrap_or_default())
        }
    }

    fn preset(choice: &str) -> ModeInputs {
        ModeInputs {
            choice: Some(choice.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn no_preset_and_no_terminal_runs_all() {
        let mode = select_mode(&ModeInputs::default(), None).unwrap();
        assert_eq!(mode, Mode::All);
    }

    #[test]
    fn preset_beats_prompt() {
        let mut prompt = ScriptedPrompt::answering(&["3"]);
        let mode = select_mode(&preset("1"), Some(&mut prompt)).unwrap();

        assert_eq!(mode, Mode::All);
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn preset_choice_is_trimmed() {
        assert_eq!(select_mode(&preset(" 1\n"), None).unwrap(), Mode::All);
    }

    #[test]
    fn interactive_single_test() {
        let mut prompt = ScriptedPrompt::answering(&["2", "test04.js"]);
        let mode = select_mode(&ModeInputs::default(), Some(&mut prompt)).unwrap();

        assert_eq!(mode, Mode::Single(TestId::new("test04")));
        assert_eq!(prompt.asked.len(), 2);
    }

    #[test]
    fn preset_single_test_from_env_value() {
        let inputs = ModeInputs {
            choice: Some("2".into()),
            test_file: Some("test/test09.js".into()),
            ..Default::default()
        };
        assert_eq!(
            select_mode(&inputs, None).unwrap(),
            Mode::Single(TestId::new("test09"))
        );
    }

    #[test]
    fn single_without_name_or_terminal_is_missing_input() {
        let err = select_mode(&preset("2"), None).unwrap_err();
        assert!(matches!(err, Error::MissingInput(msg) if msg.contains("TEST_FILE")));
    }

    #[test]
    fn interactive_range() {
        let mut prompt = ScriptedPrompt::answering(&["3", "2", "5"]);
        let mode = select_mode(&ModeInputs::default(), Some(&mut prompt)).unwrap();
        assert_eq!(mode, Mode::Range { start: 2, end: 5 });
    }

    #[test]
    fn preset_range_mixes_with_prompt() {
        let inputs = ModeInputs {
            choice: Some("3".into()),
            start: Some("9".into()),
            ..Default::default()
        };
        let mut prompt = ScriptedPrompt::answering(&["10"]);
        let mode = select_mode(&inputs, Some(&mut prompt)).unwrap();

        assert_eq!(mode, Mode::Range { start: 9, end: 10 });
        assert_eq!(prompt.asked.len(), 1);
    }

    #[test]
    fn range_without_bounds_or_terminal_is_missing_input() {
        let err = select_mode(&preset("3"), None).unwrap_err();
        assert!(matches!(err, Error::MissingInput(msg) if msg.contains("START_NUM")));
    }

    #[test]
    fn non_numeric_range_bound_is_invalid() {
        let inputs = ModeInputs {
            choice: Some("3".into()),
            start: Some("two".into()),
            end: Some("5".into()),
            ..Default::default()
        };
        assert!(matches!(
            select_mode(&inputs, None),
            Err(Error::InvalidSelection(_))
        ));
    }

    #[test]
    fn unknown_choice_is_invalid() {
        let mut prompt = ScriptedPrompt::answering(&["7"]);
        let err = select_mode(&ModeInputs::default(), Some(&mut prompt)).unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(msg) if msg.contains("'7'")));
    }
}
