use cartdeck::config::{self, Config};
use cartdeck::deck::{Deck, Flow, SharedStatus};
use cartdeck::events::PointerKind;
use cartdeck::render::HeadlessRenderer;
use cartdeck::sys::client;
use cartdeck::sys::command::Command;
use cartdeck::sys::runtime;
use cartdeck::sys::server::ServerContext;
use clap::{Parser, Subcommand};
use slotbay::{AccessKey, SlotIndex};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "cartdeck", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Control socket path (overrides the config file)
    #[arg(short, long, global = true)]
    socket: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Run the cartridge deck (the default)
    Run {
        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Access key appended to every screen URL
        #[arg(short = 'k', long)]
        access_key: Option<String>,
    },
    /// Send a pointer event to a running deck
    Pointer { kind: PointerKind, slot: usize },
    /// Click a slot on a running deck
    Click { slot: usize },
    /// Print which slot is active, queued and moving
    Status,
    /// Ask a running deck to reload its config file
    Reload,
    /// Write the default config file and print its path
    InitConfig,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = config::load_or_setup();
    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }
    let socket = config.socket_path.clone();

    match cli.command.unwrap_or(Commands::Run {
        fps: None,
        access_key: None,
    }) {
        Commands::Run { fps, access_key } => {
            if let Some(fps) = fps {
                config.fps = fps;
            }
            if let Some(key) = access_key {
                config.access_key = Some(AccessKey::new(key));
            }
            config.validate()?;
            run(config)
        }
        Commands::Pointer { kind, slot } => {
            client::send_command(&socket, Command::Pointer(kind, SlotIndex::new(slot)))
        }
        Commands::Click { slot } => client::send_command(
            &socket,
            Command::Pointer(PointerKind::Click, SlotIndex::new(slot)),
        ),
        Commands::Status => {
            println!("{}", client::query(&socket, Command::Status)?);
            Ok(())
        }
        Commands::Reload => client::send_command(&socket, Command::Reload),
        Commands::InitConfig => {
            let file = config::write_default_config()?;
            if file.written {
                println!("{}", file.path.display());
            } else {
                println!("{} (already exists)", file.path.display());
            }
            Ok(())
        }
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let (tx, rx) = async_channel::bounded(64);
    let status = SharedStatus::default();

    runtime::start_background_services(ServerContext {
        socket_path: config.socket_path.clone(),
        tx,
        status: status.clone(),
        slot_count: config.slots.len(),
    })?;

    let mut deck = Deck::new(&config, HeadlessRenderer::new(config.warmup_frames), status);
    let interval = config.frame_interval();
    log::info!(
        "cartdeck running: {} slots at {} fps, swap policy {}",
        deck.slot_count(),
        config.fps,
        config.swap_policy
    );

    loop {
        let started = Instant::now();

        // events land fully before the frame is stepped
        while let Ok(event) = rx.try_recv() {
            if deck.handle(event) == Flow::Exit {
                log::info!("Shutting down");
                return Ok(());
            }
        }

        deck.frame(started);

        if let Some(idle) = interval.checked_sub(started.elapsed()) {
            thread::sleep(idle);
        }
    }
}
