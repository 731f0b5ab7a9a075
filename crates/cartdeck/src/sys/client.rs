use crate::sys::command::Command;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

fn connect(socket_path: &Path) -> anyhow::Result<UnixStream> {
    UnixStream::connect(socket_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to cartdeck at {}: {}. Is cartdeck running?",
            socket_path.display(),
            e
        )
    })
}

pub fn send_command(socket_path: &Path, command: Command) -> anyhow::Result<()> {
    let mut stream = connect(socket_path)?;
    writeln!(stream, "{}", command)?;
    Ok(())
}

/// Sends a command that is answered with a single line.
pub fn query(socket_path: &Path, command: Command) -> anyhow::Result<String> {
    let mut stream = connect(socket_path)?;
    stream.set_read_timeout(Some(REPLY_TIMEOUT))?;
    writeln!(stream, "{}", command)?;

    let mut reply = String::new();
    BufReader::new(stream).read_line(&mut reply)?;
    if let Some(err) = reply.trim_end().strip_prefix("error: ") {
        anyhow::bail!("cartdeck rejected '{}': {}", command, err);
    }
    Ok(reply.trim_end().to_string())
}
