//! Interactive confirmation gate

use std::io::{self, BufRead, Write};

use anyhow::Context;
use drivesync_core::domain::{Change, ChangeOp};
use drivesync_core::ports::IConfirmation;

/// Lists the pending changes on stderr and asks `[y/N]` on stdin
#[derive(Debug, Default)]
pub struct PromptConfirmation;

#[async_trait::async_trait]
impl IConfirmation for PromptConfirmation {
    async fn confirm(&self, changes: &[Change]) -> anyhow::Result<bool> {
        let listing = render_changes(changes);
        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let mut stderr = io::stderr().lock();
            write!(stderr, "{listing}Apply these changes? [y/N] ")?;
            stderr.flush()?;

            let mut answer = String::new();
            io::stdin()
                .lock()
                .read_line(&mut answer)
                .context("Failed to read confirmation")?;
            Ok(parse_answer(&answer))
        })
        .await
        .context("Confirmation prompt panicked")?
    }
}

/// `y`/`yes` in any case approves; everything else, including EOF, declines
pub fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// One line per change plus a per-operation tally
pub fn render_changes(changes: &[Change]) -> String {
    let mut out = String::new();
    let (mut adds, mut modifies, mut deletes) = (0usize, 0usize, 0usize);
    for change in changes {
        match change.op() {
            ChangeOp::Add => adds += 1,
            ChangeOp::Modify => modifies += 1,
            ChangeOp::Delete => deletes += 1,
        }
        out.push_str(&format!("  {change}\n"));
    }
    out.push_str(&format!(
        "{adds} to add, {modifies} to modify, {deletes} to delete\n"
    ));
    out
}
