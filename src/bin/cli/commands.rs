use std::collections::HashMap;

use stomp_ws::{Client, Message, StompError, Subscription, Transaction};
use tokio::sync::mpsc;

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Send { destination: String, body: String },
    Subscribe(String),
    Unsubscribe(String),
    Begin(Option<String>),
    Commit,
    Abort,
    Help,
    Quit,
    Empty,
}

/// Result of executing a command
pub enum CommandResult {
    /// Command executed successfully
    Ok,
    /// Command requests exit
    Quit,
    /// Something to show the user
    Info(String),
    /// Error executing command
    Error(String),
}

/// Parse one line typed by the user.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.trim().splitn(3, ' ').collect();
    let arg = |i: usize| parts.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());

    match parts[0] {
        "" => Ok(Command::Empty),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "help" | "?" => Ok(Command::Help),
        "send" => match (arg(1), parts.get(2)) {
            (Some(dest), Some(body)) => Ok(Command::Send {
                destination: dest.to_string(),
                body: body.to_string(),
            }),
            _ => Err("Usage: send <destination> <message>".to_string()),
        },
        "sub" | "subscribe" => arg(1)
            .map(|d| Command::Subscribe(d.to_string()))
            .ok_or_else(|| "Usage: sub <destination>".to_string()),
        "unsub" | "unsubscribe" => arg(1)
            .map(|d| Command::Unsubscribe(d.to_string()))
            .ok_or_else(|| "Usage: unsub <destination>".to_string()),
        "begin" => Ok(Command::Begin(arg(1).map(str::to_string))),
        "commit" => Ok(Command::Commit),
        "abort" => Ok(Command::Abort),
        other => Err(format!("Unknown command: {}. Type 'help' for commands.", other)),
    }
}

/// Per-session state the commands act on.
pub struct Session {
    client: Client,
    messages: mpsc::UnboundedSender<Message>,
    subscriptions: HashMap<String, Subscription>,
    transaction: Option<Transaction>,
}

impl Session {
    /// `messages` receives every MESSAGE delivered to subscriptions made here.
    pub fn new(client: Client, messages: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            client,
            messages,
            subscriptions: HashMap::new(),
            transaction: None,
        }
    }

    pub fn subscribe(&mut self, destination: &str) -> Result<(), StompError> {
        if self.subscriptions.contains_key(destination) {
            return Ok(());
        }
        let tx = self.messages.clone();
        let sub = self.client.subscribe(
            destination,
            move |msg| {
                let _ = tx.send(msg);
            },
            Vec::new(),
        )?;
        self.subscriptions.insert(destination.to_string(), sub);
        Ok(())
    }

    /// Re-issue every subscription, e.g. after the client reconnected.
    pub fn resubscribe(&mut self) -> Result<(), StompError> {
        let destinations: Vec<String> = self.subscriptions.drain().map(|(d, _)| d).collect();
        for dest in destinations {
            self.subscribe(&dest)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, command: Command) -> CommandResult {
        match self.run(command) {
            Ok(result) => result,
            Err(e) => CommandResult::Error(e.to_string()),
        }
    }

    fn run(&mut self, command: Command) -> Result<CommandResult, StompError> {
        let result = match command {
            Command::Empty => CommandResult::Ok,
            Command::Quit => CommandResult::Quit,
            Command::Help => CommandResult::Info(help_text()),
            Command::Send { destination, body } => {
                let mut headers = vec![("content-type".to_string(), "text/plain".to_string())];
                if let Some(tx) = &self.transaction {
                    headers.push(("transaction".to_string(), tx.id().to_string()));
                }
                self.client.send(&destination, headers, body)?;
                CommandResult::Ok
            }
            Command::Subscribe(destination) => {
                self.subscribe(&destination)?;
                CommandResult::Info(format!("Subscribed to: {}", destination))
            }
            Command::Unsubscribe(destination) => match self.subscriptions.remove(&destination) {
                Some(sub) => {
                    sub.unsubscribe(Vec::new())?;
                    CommandResult::Info(format!("Unsubscribed from: {}", destination))
                }
                None => CommandResult::Error(format!("Not subscribed to: {}", destination)),
            },
            Command::Begin(id) => {
                if let Some(tx) = &self.transaction {
                    return Ok(CommandResult::Error(format!(
                        "Transaction {} already open",
                        tx.id()
                    )));
                }
                let tx = self.client.begin(id.as_deref())?;
                let msg = format!("Transaction {} started", tx.id());
                self.transaction = Some(tx);
                CommandResult::Info(msg)
            }
            Command::Commit => match self.transaction.take() {
                Some(tx) => {
                    tx.commit()?;
                    CommandResult::Info(format!("Transaction {} committed", tx.id()))
                }
                None => CommandResult::Error("No open transaction".to_string()),
            },
            Command::Abort => match self.transaction.take() {
                Some(tx) => {
                    tx.abort()?;
                    CommandResult::Info(format!("Transaction {} aborted", tx.id()))
                }
                None => CommandResult::Error("No open transaction".to_string()),
            },
        };
        Ok(result)
    }
}

pub fn help_text() -> String {
    [
        "Commands:",
        "  send <destination> <message>  - Send a message (inside the open transaction, if any)",
        "  sub <destination>             - Subscribe to a destination",
        "  unsub <destination>           - Cancel a subscription",
        "  begin [id]                    - Start a transaction",
        "  commit                        - Commit the open transaction",
        "  abort                         - Abort the open transaction",
        "  help                          - Show this help",
        "  quit                          - Disconnect and exit",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_with_spaces_in_body() {
        assert_eq!(
            parse_command("send /queue/a hello there world"),
            Ok(Command::Send {
                destination: "/queue/a".into(),
                body: "hello there world".into()
            })
        );
        assert!(parse_command("send /queue/a").is_err());
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("   "), Ok(Command::Empty));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert_eq!(parse_command("sub /topic/x"), Ok(Command::Subscribe("/topic/x".into())));
        assert_eq!(parse_command("unsub /topic/x"), Ok(Command::Unsubscribe("/topic/x".into())));
        assert_eq!(parse_command("begin"), Ok(Command::Begin(None)));
        assert_eq!(parse_command("begin t1"), Ok(Command::Begin(Some("t1".into()))));
        assert_eq!(parse_command("commit"), Ok(Command::Commit));
        assert_eq!(parse_command("abort"), Ok(Command::Abort));
        assert!(parse_command("sub").is_err());
        assert!(parse_command("frobnicate").unwrap_err().contains("Unknown command"));
    }
}
