use anyhow::Result;
use ledgersync_engine::{Approver, GroupPrompt, ItemPrompt};
use std::io::{self, Write};
use tracing::warn;

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

/// `j`/`ja`/`y`/`yes` accept; anything else rejects.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "j" | "ja" | "y" | "yes")
}

/// Asks on the terminal. Unreadable input counts as a rejection.
#[derive(Debug, Default)]
pub struct StdinApprover;

impl StdinApprover {
    fn ask(&self, label: &str) -> bool {
        match prompt(label) {
            Ok(answer) => is_yes(&answer),
            Err(e) => {
                warn!(error = %e, "could not read answer, rejecting");
                false
            }
        }
    }
}

impl Approver for StdinApprover {
    fn approve_group(&mut self, prompt: &GroupPrompt) -> bool {
        println!(
            "\n{} rows in {} only need {}:",
            prompt.size, prompt.document_type, prompt.key
        );
        for line in &prompt.lines {
            println!("  {line}");
        }
        self.ask("Apply all? [j/N]")
    }

    fn approve_item(&mut self, prompt: &ItemPrompt) -> bool {
        println!("\n{} ({} row {}):", prompt.key, prompt.document_type, prompt.row_number);
        for line in &prompt.lines {
            println!("  {line}");
        }
        self.ask("Apply? [j/N]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers() {
        assert!(is_yes("j"));
        assert!(is_yes("JA"));
        assert!(is_yes("yes"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("vielleicht"));
    }
}
