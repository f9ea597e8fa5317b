//! Terminal front-ends for confirmation and progress.
//!
//! Prompts and progress go to stderr so stdout carries only answers.

use std::io::{self, BufRead, Write};

use kubesage::exec::{
    Command, Confirmation, Confirmer, ProgressCounts, ProgressObserver, parse_confirmation,
    render_checklist, toggle_selection,
};

/// Read one trimmed line from stdin. `None` on EOF or read error.
pub fn read_line() -> Option<String> {
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn prompt(text: &str) {
    eprint!("{text}");
    let _ = io::stderr().flush();
}

/// Show `text` on stderr and read the reply.
pub fn prompt_line(text: &str) -> Option<String> {
    prompt(text);
    read_line()
}

/// Asks on the terminal. EOF counts as "no".
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, commands: &[Command]) -> Confirmation {
        eprintln!("\nkubesage wants to run:");
        for cmd in commands {
            eprintln!("  {cmd}");
        }
        loop {
            prompt(&format!(
                "Run {} command(s)? [y]es / [n]o / [e]dit: ",
                commands.len()
            ));
            let Some(answer) = read_line() else {
                return Confirmation::No;
            };
            match parse_confirmation(&answer) {
                Some(c) => return c,
                None => eprintln!("Please answer y, n or e."),
            }
        }
    }

    fn select(&self, commands: &[Command]) -> Vec<bool> {
        let mut selection = vec![true; commands.len()];
        loop {
            eprintln!("{}", render_checklist(commands, &selection));
            prompt("Toggle by number (e.g. `1 3`), empty line to run the checked ones: ");
            let Some(input) = read_line() else {
                return vec![false; commands.len()];
            };
            if input.is_empty() {
                return selection;
            }
            if let Err(e) = toggle_selection(&mut selection, &input) {
                eprintln!("{e}");
            }
        }
    }
}

/// Single status line on stderr, rewritten on every update.
pub struct ProgressPrinter;

impl ProgressObserver for ProgressPrinter {
    fn on_progress(&self, counts: &ProgressCounts) {
        eprint!("\r  {}", counts.to_log_string());
        if counts.is_done() {
            eprintln!();
        }
        let _ = io::stderr().flush();
    }
}
