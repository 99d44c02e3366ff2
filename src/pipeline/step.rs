use anyhow::{ensure, Result};
use std::fmt;

/// One external command invocation plus the message printed when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    name: String,
    program: String,
    args: Vec<String>,
    success_message: String,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
        success_message: impl Into<String>,
    ) -> Result<Self> {
        let program = program.into();
        ensure!(!program.trim().is_empty(), "step executable name must not be empty");

        Ok(Self {
            name: name.into(),
            program,
            args,
            success_message: success_message.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn success_message(&self) -> &str {
        &self.success_message
    }

    /// The command line as shown to the user.
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
