use std::io::{self, Write};

use anyhow::{Context, Result};

/// Prompt on stdout and read one trimmed line from stdin.
pub fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("failed to read from stdin")?;
    Ok(input.trim().to_string())
}

/// [`read_line`] off the async runtime's worker threads.
pub async fn read_line_async(prompt: String) -> Result<String> {
    tokio::task::spawn_blocking(move || read_line(&prompt)).await?
}
