use crate::deck::SharedStatus;
use crate::events::AppEvent;
use crate::sys::command::Command;
use async_channel::Sender;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

pub struct ServerContext {
    pub socket_path: PathBuf,
    pub tx: Sender<AppEvent>,
    pub status: SharedStatus,
    pub slot_count: usize,
}

pub async fn run_server(ctx: ServerContext) {
    // Cleanup old socket if it exists
    if fs_err::metadata(&ctx.socket_path).is_ok() {
        let _ = fs_err::remove_file(&ctx.socket_path);
    }

    let listener = match UnixListener::bind(&ctx.socket_path) {
        Ok(l) => l,
        Err(e) => {
            log::error!(
                "Failed to bind unix socket {}: {}",
                ctx.socket_path.display(),
                e
            );
            return;
        }
    };
    log::info!("Listening on {}", ctx.socket_path.display());

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = ctx.tx.clone();
                let status = ctx.status.clone();
                let slot_count = ctx.slot_count;
                tokio::spawn(async move {
                    serve_connection(stream, tx, status, slot_count).await;
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn serve_connection(
    mut stream: UnixStream,
    tx: Sender<AppEvent>,
    status: SharedStatus,
    slot_count: usize,
) {
    let (reader, mut writer) = stream.split();
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let reply = match line.parse::<Command>() {
            Ok(Command::Status) => {
                let snapshot = status.read().clone();
                Some(snapshot.to_string())
            }
            Ok(command) => match command.into_event(slot_count) {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                    None
                }
                Ok(None) => None,
                Err(e) => {
                    log::warn!("Dropping '{}': {}", line.trim(), e);
                    Some(format!("error: {e}"))
                }
            },
            Err(e) => {
                log::warn!("Dropping '{}': {}", line.trim(), e);
                Some(format!("error: {e}"))
            }
        };

        if let Some(reply) = reply
            && writer.write_all(format!("{reply}\n").as_bytes()).await.is_err()
        {
            return;
        }
    }
}
