use std::time::Duration;

use stomp_ws::{Client, Config, ConnectOptions};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // This example expects a STOMP broker on localhost:61613 (e.g. RabbitMQ with stomp plugin).
    let client = Client::from_url("127.0.0.1:61613", Config::default())?;

    let (ready_tx, ready_rx) = oneshot::channel();
    let mut ready_tx = Some(ready_tx);
    client.connect(
        ConnectOptions::default()
            .login("guest", "guest")
            .on_connect(move |_| {
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(());
                }
            })
            .on_error(|err| eprintln!("stomp error: {}", err)),
    )?;
    tokio::time::timeout(Duration::from_secs(5), ready_rx).await??;

    // Messages sent inside a transaction are delivered atomically on commit.
    let tx = client.begin(None)?;
    println!("Transaction {} started", tx.id());
    for n in 1..=2 {
        client.send(
            "/queue/test",
            vec![("transaction".to_string(), tx.id().to_string())],
            format!("message {} in transaction", n),
        )?;
        println!("Sent message {} in transaction", n);
    }
    tx.commit()?;
    println!("Transaction {} committed", tx.id());

    // ...and dropped on abort.
    let tx = client.begin(Some("tx-example-2"))?;
    println!("\nTransaction {} started", tx.id());
    client.send(
        "/queue/test",
        vec![("transaction".to_string(), tx.id().to_string())],
        "this message will be aborted",
    )?;
    tx.abort()?;
    println!("Transaction {} aborted", tx.id());

    let (done_tx, done_rx) = oneshot::channel();
    client.disconnect(
        move || {
            let _ = done_tx.send(());
        },
        Vec::new(),
    )?;
    tokio::time::timeout(Duration::from_secs(5), done_rx).await??;

    Ok(())
}
