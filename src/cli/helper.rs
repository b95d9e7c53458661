use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper, Result};

const COMMAND_NAMES: &[&str] = &["\\d", "\\refresh", "\\?", "\\q"];

pub struct CliHelper {}

// Input is submitted once it ends with `;` or is a backslash command; backslash
// commands get tab completion.
impl CliHelper {
    fn validate_input(&self, input: &str) -> Result<ValidationResult> {
        let complete = input.ends_with(';') || input.starts_with('\\');
        Ok(if complete {
            ValidationResult::Valid(None)
        } else {
            ValidationResult::Incomplete
        })
    }

    fn complete_command(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let prefix = &line[..pos];
        if !prefix.starts_with('\\') || prefix.contains(' ') {
            return (pos, vec![]);
        }

        let candidates = COMMAND_NAMES
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        (0, candidates)
    }
}

impl Highlighter for CliHelper {}

impl Hinter for CliHelper {
    type Hint = String;
}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>)> {
        Ok(self.complete_command(line, pos))
    }
}

impl Validator for CliHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<ValidationResult> {
        let input = ctx.input().trim_end();
        self.validate_input(input)
    }
}

impl Helper for CliHelper {}
