use std::io::{self, BufRead, Write};

use crate::error::StepError;

/// Interactive input for steps that need an operator.
pub trait Prompter: Send + Sync {
    fn ask(&self, label: &str) -> Result<String, StepError>;

    /// Like [`Prompter::ask`] without echoing the answer.
    fn secret(&self, label: &str) -> Result<String, StepError>;
}

pub struct Stdin;

impl Prompter for Stdin {
    fn ask(&self, label: &str) -> Result<String, StepError> {
        print!("{label}: ");
        io::stdout().flush().map_err(|e| StepError::Input(e.to_string()))?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| StepError::Input(e.to_string()))?;

        if read == 0 {
            return Err(StepError::Input("input closed".to_string()));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn secret(&self, label: &str) -> Result<String, StepError> {
        rpassword::prompt_password(format!("{label}: ")).map_err(|e| StepError::Input(e.to_string()))
    }
}
