use anyhow::{anyhow, bail};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Console input helper. Every reader loops until the input parses,
/// re-prompting on bad values; Ctrl-C and Ctrl-D abort the command.
pub(crate) struct Prompt {
    rl: DefaultEditor,
}

impl Prompt {
    pub(crate) fn new() -> anyhow::Result<Prompt> {
        Ok(Prompt { rl: DefaultEditor::new()? })
    }

    fn read_line(&mut self, prompt: &str) -> anyhow::Result<String> {
        match self.rl.readline(prompt) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                bail!("Input aborted")
            }
            Err(err) => Err(anyhow!(err)),
        }
    }

    pub(crate) fn read_f64(&mut self, prompt: &str) -> anyhow::Result<f64> {
        loop {
            let line = self.read_line(prompt)?;
            match line.trim().parse::<f64>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("Invalid number, please try again."),
            }
        }
    }

    pub(crate) fn read_u32(&mut self, prompt: &str) -> anyhow::Result<u32> {
        loop {
            let line = self.read_line(prompt)?;
            match line.trim().parse::<u32>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("Invalid number, please try again."),
            }
        }
    }

    pub(crate) fn read_usize(&mut self, prompt: &str) -> anyhow::Result<usize> {
        loop {
            let line = self.read_line(prompt)?;
            match line.trim().parse::<usize>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("Invalid number, please try again."),
            }
        }
    }

    /// Read a whitespace-separated series of exactly `expected` floats.
    pub(crate) fn read_series(&mut self, prompt: &str, expected: usize) -> anyhow::Result<Vec<f64>> {
        loop {
            let line = self.read_line(prompt)?;
            let parsed: Result<Vec<f64>, _> =
                line.split_whitespace().map(str::parse::<f64>).collect();
            match parsed {
                Ok(values) if values.len() == expected => return Ok(values),
                Ok(values) => {
                    println!("Expected {} values, got {}. Please try again.", expected, values.len())
                }
                Err(_) => println!("Invalid input, please try again."),
            }
        }
    }
}
