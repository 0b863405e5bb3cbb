//! External command templates.
//!
//! Collaborators are configured as argv templates with `{name}`
//! placeholders. An argument that is exactly a list placeholder (e.g.
//! `{inputs}`) expands to one argument per item; anywhere else the list is
//! joined with spaces, which suits `sh -c` style templates.

use std::collections::HashMap;
use std::process::{Output, Stdio};
use tokio::process::Command;

use crate::error::{OrchestratorError, Result};

/// Value substituted for a placeholder.
#[derive(Debug, Clone)]
pub enum Placeholder {
    One(String),
    Many(Vec<String>),
}

impl Placeholder {
    fn joined(&self) -> String {
        match self {
            Placeholder::One(value) => value.clone(),
            Placeholder::Many(values) => values.join(" "),
        }
    }
}

/// argv template for an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Parse `[program, args...]`.
    pub fn parse(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| OrchestratorError::Config("command template is empty".to_string()))?;
        if program.trim().is_empty() {
            return Err(OrchestratorError::Config(
                "command template has a blank program".to_string(),
            ));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute placeholders, producing the final argv (program excluded).
    pub fn render_args(&self, vars: &HashMap<&str, Placeholder>) -> Vec<String> {
        let mut rendered = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            if let Some(Placeholder::Many(values)) = whole_placeholder(arg).and_then(|k| vars.get(k))
            {
                rendered.extend(values.iter().cloned());
                continue;
            }
            let mut value = arg.clone();
            for (key, placeholder) in vars {
                let token = format!("{{{}}}", key);
                if value.contains(&token) {
                    value = value.replace(&token, &placeholder.joined());
                }
            }
            rendered.push(value);
        }
        rendered
    }

    /// Build a command with null stdin, captured output, and kill-on-drop so
    /// an abandoned pipeline never leaves the child running.
    pub fn command(&self, vars: &HashMap<&str, Placeholder>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.render_args(vars))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

fn whole_placeholder(arg: &str) -> Option<&str> {
    arg.strip_prefix('{').and_then(|rest| rest.strip_suffix('}'))
}

/// Last few lines of stderr for error messages.
pub fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}

/// Human readable exit status.
pub fn exit_label(output: &Output) -> String {
    match output.status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn vars() -> HashMap<&'static str, Placeholder> {
        let mut vars = HashMap::new();
        vars.insert("operation", Placeholder::One("gte".to_string()));
        vars.insert(
            "inputs",
            Placeholder::Many(vec!["/w/a.bin".to_string(), "/w/b.bin".to_string()]),
        );
        vars.insert("output", Placeholder::One("/w/proof.bin".to_string()));
        vars
    }

    #[test]
    fn test_list_placeholder_expands_to_separate_args() {
        let template =
            CommandTemplate::parse(&argv(&["prover", "--op", "{operation}", "{inputs}", "--out={output}"]))
                .unwrap();
        assert_eq!(template.program(), "prover");
        assert_eq!(
            template.render_args(&vars()),
            argv(&["--op", "gte", "/w/a.bin", "/w/b.bin", "--out=/w/proof.bin"])
        );
    }

    #[test]
    fn test_embedded_list_placeholder_is_joined() {
        let template =
            CommandTemplate::parse(&argv(&["sh", "-c", "cat {inputs} > {output}"])).unwrap();
        assert_eq!(
            template.render_args(&vars()),
            argv(&["-c", "cat /w/a.bin /w/b.bin > /w/proof.bin"])
        );
    }

    #[test]
    fn test_unknown_placeholder_left_alone() {
        let template = CommandTemplate::parse(&argv(&["prover", "{unknown}"])).unwrap();
        assert_eq!(template.render_args(&vars()), argv(&["{unknown}"]));
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(matches!(
            CommandTemplate::parse(&[]),
            Err(OrchestratorError::Config(_))
        ));
        assert!(matches!(
            CommandTemplate::parse(&argv(&[" "])),
            Err(OrchestratorError::Config(_))
        ));
    }
}
