//! # chatservice-console
//!
//! Terminal chat client. Joins one channel, prints the latest history and live
//! traffic, and posts every line typed at the prompt.
//!
//! Commands: `/online`, `/trust <username>`, `/quit`. Ctrl+C also quits.

mod config;
mod input;

use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatservice_client::{ChatClient, ConnectionState, JsonFileTrustPersistence, Message, User};

use crate::config::ConsoleConfig;
use crate::input::Input;

/// Live events forwarded from the background task to the prompt loop.
enum Event {
    Message(Message),
    Online(User),
    Offline(User),
    State(ConnectionState),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they do not interleave with the chat on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("chatservice_client=info,chatservice_console=info,warn")
        }))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting chat console v{}", env!("CARGO_PKG_VERSION"));

    let config = ConsoleConfig::from_env();
    info!(?config, "Loaded configuration");

    let persistence = Arc::new(JsonFileTrustPersistence::new(&config.trust_file));
    let mut client = ChatClient::with_persistence(config.session.clone(), &config.channel, persistence)
        .context("Failed to create chat session")?;

    if std::env::var("CHAT_PRIVATE_KEY").is_err() {
        println!(
            "Generated a new key. Set CHAT_PRIVATE_KEY={} to keep this identity.",
            client.private_key()
        );
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    register_listeners(&client, events_tx);

    client.connect().await?;
    println!(
        "Connected to #{} as {} ({} trusted users)",
        client.channel(),
        client.username(),
        client.trusted_users().len()
    );

    match client.get_messages(config.history, 0).await {
        Ok(history) => {
            for message in &history {
                println!("{}", format_message(&client, message));
            }
        }
        Err(e) => warn!(error = %e, "Failed to fetch message history"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            Some(event) = events_rx.recv() => print_event(&client, event),
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                if !handle_input(&mut client, Input::parse(&line)).await {
                    break;
                }
            }
        }
    }

    client.shutdown().await.context("Failed to save trusted users")?;
    println!("Bye!");
    Ok(())
}

fn register_listeners(client: &ChatClient, tx: mpsc::UnboundedSender<Event>) {
    let message_tx = tx.clone();
    client.on_message(move |m| {
        let _ = message_tx.send(Event::Message(m.clone()));
    });
    let online_tx = tx.clone();
    client.on_user_online(move |u| {
        let _ = online_tx.send(Event::Online(u.clone()));
    });
    let offline_tx = tx.clone();
    client.on_user_offline(move |u| {
        let _ = offline_tx.send(Event::Offline(u.clone()));
    });
    client.on_connection_state(move |s| {
        let _ = tx.send(Event::State(s));
    });
}

/// Returns `false` once the user asked to quit.
async fn handle_input(client: &mut ChatClient, input: Input) -> bool {
    match input {
        Input::Blank => {}
        Input::Quit => return false,
        Input::Say(text) => {
            // Our own message comes back over live updates when they are on.
            match client.send_message(&text).await {
                Ok(sent) if !client.config().enable_live_updates => {
                    println!("{}", format_message(client, &sent));
                }
                Ok(_) => {}
                Err(e) => println!("! Failed to send: {e}"),
            }
        }
        Input::Online => match client.get_online_users().await {
            Ok(users) => {
                println!("{} online:", users.len());
                for user in &users {
                    let marker = if client.trusted_users().is_trusted(user) {
                        " [trusted]"
                    } else {
                        ""
                    };
                    println!("  {user}{marker}");
                }
            }
            Err(e) => println!("! Failed to list online users: {e}"),
        },
        Input::Trust(name) => trust_online_user(client, &name).await,
        Input::Unknown(command) => {
            println!("! Unknown command {command}. Try /online, /trust <username> or /quit");
        }
    }
    true
}

async fn trust_online_user(client: &mut ChatClient, name: &str) {
    let users = match client.get_online_users().await {
        Ok(users) => users,
        Err(e) => {
            println!("! Failed to list online users: {e}");
            return;
        }
    };

    let Some(user) = users.into_iter().find(|u| u.username == name) else {
        println!("! {name} is not online");
        return;
    };
    if client.trusted_users().is_trusted(&user) {
        println!("{name} is already trusted");
        return;
    }

    client.trusted_users_mut().trust_user(user);
    match client.save_trusted_users() {
        Ok(()) => println!("Now trusting {name}"),
        Err(e) => println!("! Trusted {name}, but saving failed: {e}"),
    }
}

fn print_event(client: &ChatClient, event: Event) {
    match event {
        Event::Message(message) => println!("{}", format_message(client, &message)),
        Event::Online(user) => println!("* {} joined", user.username),
        Event::Offline(user) => println!("* {} left", user.username),
        Event::State(ConnectionState::Reconnecting) => println!("* Connection lost, reconnecting..."),
        Event::State(_) => {}
    }
}

fn format_message(client: &ChatClient, message: &Message) -> String {
    let time = message
        .created_at_utc()
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    let marker = if client.is_own_message(message) {
        " (you)"
    } else if client.is_message_trusted(message) {
        " [trusted]"
    } else {
        ""
    };
    format!("[{time}] {}{marker}: {}", message.creator_name, message.text)
}
