//! Result rendering for CLI commands.
//!
//! Results go to stdout; per-document headers and warnings go to stderr so
//! stdout stays machine-readable.

use std::fs;
use std::path::Path;

use console::style;
use serde::Serialize;
use serde_json::json;

use tika::{TextResult, Unpacked};

fn header(source: Option<&str>) {
    if let Some(source) = source {
        eprintln!("{} {}", style("→").cyan(), source);
    }
}

pub fn failed_status(source: Option<&str>, status: u16) {
    eprintln!(
        "{} {} returned status {}",
        style("!").yellow(),
        source.unwrap_or("request"),
        status
    );
}

/// Print any serializable result as pretty JSON.
pub fn json<T: Serialize>(source: Option<&str>, value: &T) -> anyhow::Result<()> {
    header(source);
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn text(source: Option<&str>, result: &TextResult) {
    header(source);
    if !(200..300).contains(&result.status) {
        failed_status(source, result.status);
    }
    println!("{}", result.text.trim_end());
}

/// Print unpack results and optionally write attachments to `output_dir`.
pub fn unpacked(
    source: Option<&str>,
    unpacked: &Unpacked,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    if !(200..300).contains(&unpacked.status) {
        failed_status(source, unpacked.status);
    }

    let attachments: Vec<_> = unpacked
        .attachments
        .iter()
        .map(|(name, data)| json!({ "name": name, "size": data.len() }))
        .collect();
    json(
        source,
        &json!({
            "status": unpacked.status,
            "content": unpacked.content,
            "metadata": unpacked.metadata,
            "attachments": attachments,
        }),
    )?;

    let Some(dir) = output_dir else {
        return Ok(());
    };
    fs::create_dir_all(dir)?;
    for (name, data) in &unpacked.attachments {
        // Member names may carry directories; keep only the file name
        let Some(file_name) = Path::new(name).file_name() else {
            continue;
        };
        let dest = dir.join(file_name);
        fs::write(&dest, data)?;
        eprintln!("{} Wrote {}", style("✓").green(), dest.display());
    }
    Ok(())
}
