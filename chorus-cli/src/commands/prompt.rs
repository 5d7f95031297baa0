use std::io::{self, BufRead, Write};

use chorus_core::Confirm;

/// Asks on stdin; anything but `y`/`yes` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Asks before a destructive command touches the room.
///
/// Runs before any busy flag is taken; the stdin read happens on the
/// blocking pool.
pub async fn ask(assume_yes: bool, prompt: String) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Ok(tokio::task::spawn_blocking(move || StdinConfirm.confirm(&prompt)).await?)
}
