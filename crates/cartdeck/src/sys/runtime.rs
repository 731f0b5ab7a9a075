use crate::events::AppEvent;
use crate::sys::server::{self, ServerContext};
use async_channel::Sender;
use std::thread;
use tokio::runtime::Runtime;

/// Starts the socket server, the config watcher and the signal listener on
/// a tokio runtime of their own. The frame loop stays on the calling thread.
pub fn start_background_services(ctx: ServerContext) -> std::io::Result<()> {
    let rt = Runtime::new()?;
    let tx = ctx.tx.clone();

    thread::Builder::new()
        .name("cartdeck-services".into())
        .spawn(move || {
            rt.block_on(async {
                tokio::spawn(server::run_server(ctx));

                {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        crate::config::run_async_watcher(tx).await;
                    });
                }

                {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        forward_shutdown(tx).await;
                    });
                }

                std::future::pending::<()>().await;
            });
        })?;

    Ok(())
}

async fn forward_shutdown(tx: Sender<AppEvent>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            let _ = tx.send(AppEvent::Shutdown).await;
        }
        Err(e) => log::error!("Failed to listen for ctrl-c: {}", e),
    }
}
