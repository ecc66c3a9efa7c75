//! Splitting of encoder command strings into arguments

use crate::domain::errors::DomainError;

/// Split a command string on whitespace, keeping double-quoted runs intact
///
/// Quotes are removed from the resulting arguments. A quote may start in
/// the middle of an argument (`scale="1:2"` yields `scale=1:2`).
pub fn split_command(command: &str) -> Result<Vec<String>, DomainError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in command.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(DomainError::BadArgs(format!(
            "Unbalanced quote in command: {}",
            command
        )));
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}
