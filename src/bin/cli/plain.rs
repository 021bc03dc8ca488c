use std::io::{self, BufRead, Write};
use std::time::Duration;

use stomp_ws::{Client, Config, ConnectOptions, ErrorEvent, Message, parse_heartbeat_header};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::args::Cli;
use super::commands::{CommandResult, Session, help_text, parse_command};
use super::exit_codes;

/// Lifecycle notifications forwarded from client callbacks to the UI loop.
enum Notice {
    Connected(String),
    Error(ErrorEvent),
    Closed(String),
}

/// Run the CLI in plain line mode
pub async fn run(cli: &Cli) -> Result<(), (String, u8)> {
    let (outgoing, incoming) = parse_heartbeat_header(&cli.heartbeat);
    let config = Config::default()
        .with_heartbeat(outgoing, incoming)
        .with_reconnect_delay(Duration::from_millis(cli.reconnect_ms));
    let client = Client::from_url(&cli.url, config)
        .map_err(|e| (e.to_string(), exit_codes::USAGE_ERROR))?;

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let (on_connect, on_error, on_close) = (notice_tx.clone(), notice_tx.clone(), notice_tx);
    let mut options = ConnectOptions::default()
        .login(cli.login.as_str(), cli.passcode.as_str())
        .on_connect(move |frame| {
            let version = frame.get_header("version").unwrap_or("1.0").to_string();
            let _ = on_connect.send(Notice::Connected(version));
        })
        .on_error(move |err| {
            let _ = on_error.send(Notice::Error(err));
        })
        .on_close(move |close| {
            let _ = on_close.send(Notice::Closed(close.to_string()));
        });
    if let Some(host) = &cli.host {
        options = options.host(host.as_str());
    }

    println!("Connecting to {}...", cli.url);
    client
        .connect(options)
        .map_err(|e| (e.to_string(), exit_codes::USAGE_ERROR))?;
    wait_for_connected(&mut notice_rx, &cli.url).await?;

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(client.clone(), msg_tx);
    for dest in &cli.subscribe {
        session
            .subscribe(dest)
            .map_err(|e| (format!("Failed to subscribe to '{}': {}", dest, e), exit_codes::PROTOCOL_ERROR))?;
        println!("Subscribed to: {}", dest);
    }

    let mut lines = spawn_stdin_reader();

    println!();
    println!("{}", help_text());
    println!();
    prompt();

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                let result = match parse_command(&line) {
                    Ok(cmd) => session.execute(cmd),
                    Err(msg) => CommandResult::Error(msg),
                };
                match result {
                    CommandResult::Ok => {}
                    CommandResult::Quit => break,
                    CommandResult::Info(msg) => println!("{}", msg),
                    CommandResult::Error(msg) => eprintln!("{}", msg),
                }
                prompt();
            }
            Some(msg) = msg_rx.recv() => {
                print_message(&msg);
                prompt();
            }
            Some(notice) = notice_rx.recv() => {
                match notice {
                    Notice::Connected(version) => {
                        println!("\nReconnected (STOMP {}).", version);
                        if let Err(e) = session.resubscribe() {
                            eprintln!("Failed to restore subscriptions: {}", e);
                        }
                    }
                    Notice::Error(ErrorEvent::Frame(frame)) => {
                        eprintln!("\n[BROKER ERROR] {}", ErrorEvent::Frame(frame.clone()));
                        for (k, v) in &frame.headers {
                            eprintln!("  {}: {}", k, v);
                        }
                    }
                    Notice::Error(err) => eprintln!("\n[ERROR] {}", err),
                    Notice::Closed(reason) => {
                        eprintln!("\nConnection closed: {}", reason);
                        if cli.reconnect_ms == 0 {
                            return Err(("Connection lost".to_string(), exit_codes::NETWORK_ERROR));
                        }
                    }
                }
                prompt();
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("Disconnecting...");
    let (done_tx, done_rx) = oneshot::channel();
    let _ = client.disconnect(
        move || {
            let _ = done_tx.send(());
        },
        Vec::new(),
    );
    if tokio::time::timeout(Duration::from_secs(5), done_rx).await.is_err() {
        debug!("no disconnect receipt within 5s");
    }
    Ok(())
}

/// Wait for the handshake outcome and map failures to exit codes.
async fn wait_for_connected(
    notices: &mut mpsc::UnboundedReceiver<Notice>,
    url: &str,
) -> Result<(), (String, u8)> {
    let mut last_error = None;
    while let Some(notice) = notices.recv().await {
        match notice {
            Notice::Connected(version) => {
                println!("Connected (STOMP {}).", version);
                return Ok(());
            }
            Notice::Error(ErrorEvent::Frame(frame)) => {
                return Err((
                    format!("Authentication failed: {}", ErrorEvent::Frame(frame)),
                    exit_codes::AUTH_ERROR,
                ));
            }
            Notice::Error(ErrorEvent::Protocol(e)) => {
                return Err((format!("Protocol error: {}", e), exit_codes::PROTOCOL_ERROR));
            }
            Notice::Error(err) => last_error = Some(err.to_string()),
            Notice::Closed(reason) => {
                let detail = last_error.take().unwrap_or(reason);
                return Err((
                    format!("Connection to {} failed: {}", url, detail),
                    exit_codes::NETWORK_ERROR,
                ));
            }
        }
    }
    Err(("client stopped".to_string(), exit_codes::NETWORK_ERROR))
}

/// Forward stdin lines from a blocking reader thread.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.blocking_send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn print_message(msg: &Message) {
    println!("\n[{}] MESSAGE received:", msg.destination().unwrap_or("?"));
    for (k, v) in &msg.frame.headers {
        println!("  {}: {}", k, v);
    }
    if !msg.frame.body.is_empty() {
        match std::str::from_utf8(&msg.frame.body) {
            Ok(s) => println!("  Body: {}", s),
            Err(_) => println!("  Body: ({} bytes, binary)", msg.frame.body.len()),
        }
    }
}
