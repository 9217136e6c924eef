use std::io::{self, Write};

use anyhow::{Context, Result};

/// Prompts with `label` and reads one line from stdin. `None` means
/// end-of-input (closed stdin or Ctrl-D).
pub fn ask_or_eof(label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .context("Failed to read stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(['\n', '\r']).to_string()))
}
