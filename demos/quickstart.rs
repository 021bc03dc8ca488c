use std::time::Duration;

use stomp_ws::{Client, Config, ConnectOptions};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // This example expects a STOMP broker on localhost:61613 (e.g. RabbitMQ with stomp plugin).
    // Pass a ws:// URL instead when built with `--features websocket`.
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:61613".to_string());

    let client = Client::from_url(&url, Config::default())?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let c = client.clone();
    client.connect(
        ConnectOptions::default()
            .login("guest", "guest")
            .host("/")
            .on_connect(move |frame| {
                println!("connected, STOMP {}", frame.get_header("version").unwrap_or("1.0"));
                let tx = tx.clone();
                let _ = c.subscribe(
                    "/queue/test",
                    move |msg| {
                        let _ = tx.send(msg);
                    },
                    Vec::new(),
                );
                let _ = c.send("/queue/test", Vec::new(), "hello from stomp-ws example");
            })
            .on_error(|err| eprintln!("stomp error: {}", err)),
    )?;

    // Wait for our own message to come back, but don't block forever.
    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(msg)) => println!("received frame:\n{}", msg.frame),
        Ok(None) => println!("client stopped, no frames received"),
        Err(_) => println!("timed out waiting for a frame"),
    }

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    client.disconnect(
        move || {
            let _ = done_tx.send(());
        },
        Vec::new(),
    )?;
    let _ = tokio::time::timeout(Duration::from_secs(5), done_rx.recv()).await;

    Ok(())
}
