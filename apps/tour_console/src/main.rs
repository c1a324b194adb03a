use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use client_core::{load_settings, SessionEvent, SyncError, TourSession};
use shared::domain::Tour;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{Command, HELP};

#[derive(Parser, Debug)]
struct Args {
    /// Backend base URL; overrides the config file and environment.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    tracing::info!(api = %settings.api_base_url, "starting tour console");

    let session = TourSession::from_settings(&settings)?;
    tokio::spawn(render_events(session.subscribe_events()));

    let mut mount = session.mount();
    mount.settled().await;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(commands::ParseError::Empty) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(err) = run(&session, command).await {
            // Backend failures were already reported through SyncFailed.
            if err.is_guard() {
                println!("{err}");
            }
        }
    }

    mount.unmount();
    Ok(())
}

async fn run(session: &TourSession, command: Command) -> Result<(), SyncError> {
    match command {
        Command::Tours => {
            let snapshot = session.snapshot().await;
            if snapshot.tours.is_empty() {
                println!("no tours");
            }
            for tour in &snapshot.tours {
                let marker = match &snapshot.active_tour {
                    Some(active) if active.id == tour.id => "*",
                    _ => " ",
                };
                println!("{marker} {:>4}  {}", tour.id.0, tour.name);
            }
        }
        Command::Select(tour_id) => {
            session.select_tour(tour_id).await?;
            print_tour(session.snapshot().await.active_tour.as_ref());
        }
        Command::Create(name) => {
            let tour_id = session.create_tour(&name).await?;
            println!("created tour {tour_id}");
        }
        Command::Delete => {
            if !session.delete_tour().await? {
                println!("no tour selected");
            }
        }
        Command::Search(query) => {
            session.search(&query).await?;
            let search = session.snapshot().await.search;
            if search.results.is_empty() {
                println!("no results for `{}`", search.query);
            }
            for candidate in search.candidates() {
                println!(
                    "{:>3}  {}  ({:.6}, {:.6})",
                    candidate.index,
                    candidate.result.address,
                    candidate.result.latitude,
                    candidate.result.longitude
                );
            }
        }
        Command::Add(index) => {
            let location_id = session.add_location_to_tour(index).await?;
            println!("added location {location_id}");
        }
        Command::Close => session.close_search().await,
        Command::Remove(location_id) => {
            session.remove_location_from_tour(location_id).await?;
            print_tour(session.snapshot().await.active_tour.as_ref());
        }
        Command::Show => {
            print_tour(session.snapshot().await.active_tour.as_ref());
            if let Some(bounds) = session.bounds().await {
                let [lat, lon] = bounds.center();
                println!("map centre ({lat:.6}, {lon:.6})");
            }
            println!("polyline: {} points", session.polyline().await.len());
        }
        Command::Route => match session.planned_route().await {
            Some(plan) => match serde_json::to_string(&plan) {
                Ok(json) => println!("{json}"),
                Err(err) => println!("could not render route: {err}"),
            },
            None => println!("no stops to plan"),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_tour(tour: Option<&Tour>) {
    let Some(tour) = tour else {
        println!("no tour selected");
        return;
    };
    println!("tour {}: {} ({} stops)", tour.id, tour.name, tour.locations.len());
    for location in &tour.locations {
        println!(
            "  [{}] {}  ({:.6}, {:.6})",
            location.id, location.name, location.latitude, location.longitude
        );
    }
}

async fn render_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::SyncFailed { operation, message }) => {
                println!("! {operation} failed: {message}");
            }
            Ok(SessionEvent::RegistryUpdated(tours)) => {
                tracing::debug!(tours = tours.len(), "registry updated");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event renderer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
