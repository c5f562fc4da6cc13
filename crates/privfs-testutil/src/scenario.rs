//! Scenario file parser and runner.
//!
//! Format of `tests/scenarios/*.test`:
//!
//! ```text
//! # test: notes_round_trip
//! ---
//! name notes.txt
//! content abc
//! write
//! read
//! ---
//! File "notes.txt" written successfully!
//! File content: abc
//! ===
//! ```
//!
//! The first block is fed line by line to a command executor. Every
//! output line is matched against the second block, and a mismatch names
//! the command that printed the offending line.

use std::fmt;

/// A single scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioCase {
    /// Name from the `# test: name` line.
    pub name: String,
    /// Line number where the scenario starts (1-indexed).
    pub line_number: usize,
    /// Commands, one per line.
    pub commands: Vec<String>,
    /// Expected output lines.
    pub expected: Vec<String>,
}

/// Parse the scenario file format.
pub fn parse_scenarios(content: &str) -> Vec<ScenarioCase> {
    let mut cases = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        let Some(name) = line.strip_prefix("# test:") else {
            i += 1;
            continue;
        };
        let name = name.trim().to_string();
        let start_line = i + 1;
        i += 1;

        // Skip to first ---
        while i < lines.len() && lines[i].trim() != "---" {
            i += 1;
        }
        i += 1;

        let mut commands = Vec::new();
        while i < lines.len() && lines[i].trim() != "---" {
            let command = lines[i].trim();
            if !command.is_empty() {
                commands.push(command.to_string());
            }
            i += 1;
        }
        i += 1;

        let mut block = Vec::new();
        while i < lines.len() && lines[i].trim() != "===" {
            block.push(lines[i]);
            i += 1;
        }
        i += 1;

        cases.push(ScenarioCase {
            name,
            line_number: start_line,
            commands,
            expected: block
                .join("\n")
                .trim()
                .lines()
                .map(|l| l.trim_end().to_string())
                .collect(),
        });
    }

    cases
}

/// How a scenario went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    Pass,
    /// Output line `line` (0-indexed) differs. `actual` is `None` when the
    /// output ran out, `expected` is `None` when there was extra output.
    Mismatch {
        line: usize,
        command: Option<String>,
        expected: Option<String>,
        actual: Option<String>,
    },
    /// The executor gave up on command `index`.
    Failed {
        index: usize,
        command: String,
        message: String,
    },
}

impl ScenarioOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ScenarioOutcome::Pass)
    }
}

impl ScenarioCase {
    /// Run the commands through `exec` and compare output lines.
    ///
    /// `exec` returns `Ok(None)` for commands without output.
    pub fn run<F>(&self, mut exec: F) -> ScenarioOutcome
    where
        F: FnMut(&str) -> Result<Option<String>, String>,
    {
        // Each printed line with the index of the command that printed it
        let mut printed: Vec<(usize, String)> = Vec::new();
        for (index, command) in self.commands.iter().enumerate() {
            match exec(command) {
                Ok(Some(output)) => printed.extend(
                    output
                        .lines()
                        .map(|line| (index, line.trim_end().to_string())),
                ),
                Ok(None) => {}
                Err(message) => {
                    return ScenarioOutcome::Failed {
                        index,
                        command: command.clone(),
                        message,
                    };
                }
            }
        }
        while printed.last().is_some_and(|(_, line)| line.is_empty()) {
            printed.pop();
        }

        for line in 0..printed.len().max(self.expected.len()) {
            let actual = printed.get(line);
            let expected = self.expected.get(line);
            if actual.map(|(_, text)| text) == expected {
                continue;
            }
            let command = actual
                .map(|(index, _)| *index)
                .or(self.commands.len().checked_sub(1))
                .map(|index| self.commands[index].clone());
            return ScenarioOutcome::Mismatch {
                line,
                command,
                expected: expected.cloned(),
                actual: actual.map(|(_, text)| text.clone()),
            };
        }
        ScenarioOutcome::Pass
    }
}

/// Outcomes of a scenario file, by scenario name and start line.
#[derive(Debug, Default)]
pub struct ScenarioReport {
    pub outcomes: Vec<(String, usize, ScenarioOutcome)>,
}

impl ScenarioReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|(_, _, o)| o.is_pass()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.outcomes.len()
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "scenarios: {} of {} passed",
            self.passed(),
            self.outcomes.len()
        )?;
        for (name, line_number, outcome) in &self.outcomes {
            match outcome {
                ScenarioOutcome::Pass => {}
                ScenarioOutcome::Mismatch {
                    line,
                    command,
                    expected,
                    actual,
                } => {
                    writeln!(f, "  {name} (line {line_number}): output line {} differs", line + 1)?;
                    if let Some(command) = command {
                        writeln!(f, "    command:  {command}")?;
                    }
                    writeln!(f, "    expected: {}", expected.as_deref().unwrap_or("<nothing>"))?;
                    writeln!(f, "    actual:   {}", actual.as_deref().unwrap_or("<nothing>"))?;
                }
                ScenarioOutcome::Failed {
                    index,
                    command,
                    message,
                } => {
                    writeln!(
                        f,
                        "  {name} (line {line_number}): command #{} `{command}` failed: {message}",
                        index + 1
                    )?;
                }
            }
        }
        Ok(())
    }
}

/// Run every scenario, each with a fresh executor from `make_exec`.
pub fn run_scenarios<M, F>(cases: &[ScenarioCase], mut make_exec: M) -> ScenarioReport
where
    M: FnMut() -> F,
    F: FnMut(&str) -> Result<Option<String>, String>,
{
    let outcomes = cases
        .iter()
        .map(|case| (case.name.clone(), case.line_number, case.run(make_exec())))
        .collect();
    ScenarioReport { outcomes }
}
