use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use notes_explorer::Explorer;
use notes_explorer::model::config::AppConfig;
use notes_explorer::model::window::WindowMode;
use notes_explorer::msg::Msg;
use notes_explorer::source::FsVault;

fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // Initialize logging to file (never stdout, which carries the view)
    let log_dir = directories::ProjectDirs::from("", "", "notes-explorer")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "notes-explorer.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_new(&config.general.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("notes_explorer=info"));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .init();

    tracing::info!("notes-explorer starting on {}", config.vault_path().display());

    run(config)
}

fn run(config: AppConfig) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let vault = FsVault::new(config.vault_path());
    let mut explorer = Explorer::from_config(&config, vault.collaborators(), tx.clone());

    // Input thread: one command per line
    let tx_input = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match Msg::parse_command(&line) {
                Some(msg) => {
                    if tx_input.send(msg).is_err() {
                        return;
                    }
                }
                None if line.trim().is_empty() => {}
                None => tracing::warn!("unknown command: {line}"),
            }
        }
        let _ = tx_input.send(Msg::Quit);
    });

    explorer.start();
    let mut stdout = io::stdout();
    render(&explorer, &mut stdout)?;

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        explorer.update(first);

        while let Ok(msg) = rx.try_recv() {
            explorer.update(msg);
        }

        if explorer.should_quit {
            break;
        }

        render(&explorer, &mut stdout)?;
    }

    tracing::info!("notes-explorer exiting");
    Ok(())
}

fn render(explorer: &Explorer, out: &mut impl Write) -> io::Result<()> {
    let status = explorer.status();
    writeln!(out)?;
    for doc in explorer.displayed() {
        let marker = if explorer.pinned().contains(&doc.path) {
            "*"
        } else {
            " "
        };
        writeln!(out, "{marker} {:<32} {}", doc.name, doc.path)?;
    }

    if !explorer.tags().is_empty() {
        writeln!(out, "tags: {}", explorer.tags().join(" "))?;
    }

    let state = explorer.state();
    match status.mode {
        WindowMode::Paged => write!(
            out,
            "page {}/{} ({} of {})",
            status.page,
            status.total_pages.max(1),
            status.shown,
            status.total
        )?,
        WindowMode::Infinite => write!(
            out,
            "current cards: {} of {}",
            status.shown, status.total
        )?,
    }
    write!(out, " | sort {}", state.sort)?;
    if !state.query.is_empty() {
        write!(out, " | query \"{}\"", state.query)?;
    }
    if explorer.is_pending() {
        write!(out, " | working")?;
    }
    writeln!(out)?;
    out.flush()
}
