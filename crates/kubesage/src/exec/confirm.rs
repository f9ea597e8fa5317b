//! Safe-mode confirmation: one yes/no/edit decision per batch.
//!
//! The engine asks a [`Confirmer`] once before anything runs. `Edit` lets the
//! operator deselect individual commands through a checklist. Implementations
//! block on operator input; the pipeline waits for them.

use super::command::Command;

/// The operator's answer for a whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Run every command.
    Yes,
    /// Run nothing; each command gets a skipped result.
    No,
    /// Pick commands individually via [`Confirmer::select`].
    Edit,
}

/// Source of safe-mode decisions (terminal prompt, test double, policy).
pub trait Confirmer: Send + Sync {
    /// Decide for the whole batch.
    fn confirm(&self, commands: &[Command]) -> Confirmation;

    /// One flag per command, `true` = run. Missing entries count as `false`.
    /// Only called after [`confirm`](Self::confirm) returned `Edit`.
    fn select(&self, commands: &[Command]) -> Vec<bool> {
        vec![true; commands.len()]
    }
}

/// Approves every batch.
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, _commands: &[Command]) -> Confirmation {
        Confirmation::Yes
    }
}

/// Parse a `y/n/e` style answer. Unknown input yields `None`.
pub fn parse_confirmation(input: &str) -> Option<Confirmation> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Confirmation::Yes),
        "n" | "no" => Some(Confirmation::No),
        "e" | "edit" => Some(Confirmation::Edit),
        _ => None,
    }
}

/// Toggle checklist entries by 1-based number (`"1 3"`, `"2,4"`).
///
/// Returns an error naming the first entry that is not a valid number;
/// the selection is left untouched in that case.
pub fn toggle_selection(selection: &mut [bool], input: &str) -> Result<(), String> {
    let mut indices = Vec::new();
    for part in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
    {
        match part.parse::<usize>() {
            Ok(n) if (1..=selection.len()).contains(&n) => indices.push(n - 1),
            _ => {
                return Err(format!(
                    "'{part}' is not a number between 1 and {}",
                    selection.len()
                ));
            }
        }
    }
    for idx in indices {
        selection[idx] = !selection[idx];
    }
    Ok(())
}

/// Render the checklist shown while editing a batch.
pub fn render_checklist(commands: &[Command], selection: &[bool]) -> String {
    commands
        .iter()
        .enumerate()
        .map(|(i, cmd)| {
            let mark = if selection.get(i).copied().unwrap_or(false) {
                "x"
            } else {
                " "
            };
            format!("[{mark}] {}. {}", i + 1, cmd.text())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
