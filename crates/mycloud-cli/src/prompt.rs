//! Reading answers from stdin. Prompts go to stderr so stdout stays pipeable.

use std::io::Write;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn ask(question: &str) -> anyhow::Result<String> {
    {
        let mut err = std::io::stderr().lock();
        write!(err, "{question}: ")?;
        err.flush()?;
    }

    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read from stdin")?;
    if read == 0 {
        bail!("No input for \"{question}\"");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Use `given` if present, otherwise ask.
pub async fn value_or_ask(given: Option<String>, question: &str) -> anyhow::Result<String> {
    match given {
        Some(value) => Ok(value),
        None => ask(question).await,
    }
}

pub async fn confirm(question: &str) -> anyhow::Result<bool> {
    let answer = ask(&format!("{question} [y/N]")).await?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
