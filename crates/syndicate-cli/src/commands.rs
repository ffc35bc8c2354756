//! The tool bodies, writing to any `io::Write`.

use std::io::Write;

use anyhow::{Context, Result};
use syndicate_config::log_cli_info;
use syndicate_ug::{Client, DirEntry, OpenMode, UgApi};

/// Stream each file in `paths` to `out`, `chunk` bytes at a time.
pub fn cat<A: UgApi, W: Write>(client: &Client<A>, paths: &[String], chunk: usize, out: &mut W) -> Result<()> {
    anyhow::ensure!(chunk > 0, "read chunk size must be positive");
    for path in paths {
        let mut fh = client.open(path, OpenMode::Read)?;
        let mut total = 0usize;
        loop {
            let buf = fh.read(chunk)?;
            if buf.is_empty() {
                break;
            }
            out.write_all(&buf).context("Failed to write to stdout")?;
            total += buf.len();
            if buf.len() < chunk {
                break;
            }
        }
        fh.close()?;
        log_cli_info!("cat", path = path.as_str(), bytes = total);
    }
    out.flush()?;
    Ok(())
}

fn describe(entry: &DirEntry) -> Result<Option<String>> {
    let kind = if entry.is_file() {
        "file"
    } else if entry.is_dir() {
        "directory"
    } else {
        return Ok(None);
    };
    Ok(Some(format!("{}: {}", kind, entry.to_json()?)))
}

/// Print the metadata of `path`; for a directory also list its entries.
pub fn ls<A: UgApi, W: Write>(client: &Client<A>, path: &str, out: &mut W) -> Result<()> {
    let entry = client.stat_raw(path)?;
    if let Some(line) = describe(&entry)? {
        writeln!(out, "{}", line)?;
    }
    if entry.is_dir() {
        let entries = client.list_dir(path)?;
        writeln!(out, "directory '{}' has {} entries", path, entries.len())?;
        for child in &entries {
            if let Some(line) = describe(child)? {
                writeln!(out, "{}", line)?;
            }
        }
    }
    Ok(())
}

/// Create every directory in `paths` with the umask-derived mode, stopping
/// at the first failure.
pub fn mkdir<A: UgApi>(client: &Client<A>, paths: &[String]) -> Result<()> {
    for path in paths {
        client
            .mkdir(path, None)
            .with_context(|| format!("Failed to mkdir '{}'", path))?;
        log_cli_info!("mkdir", path = path.as_str());
    }
    Ok(())
}
