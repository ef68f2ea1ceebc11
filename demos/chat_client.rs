//! Chat client for the FIFO relay
//!
//! Run with: cargo run --example chat_client <NAME> [DIR]
//!
//! Start the relay first (`cargo run -- --dir /tmp/fifo-relay`), then run two
//! or more clients with different names. Lines typed into one client appear in
//! all the others. Ctrl-D disconnects.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::pipe;

const READY: &[u8] = b"READY\n";

/// How long the relay gets to answer a registration
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn wait_for(path: &Path, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while !path.exists() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

fn not_accepted(name: &str) -> ! {
    eprintln!(
        "[{}] Registration not accepted (name in use, invalid, or relay full)",
        name
    );
    std::process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(name) = args.next() else {
        eprintln!("Usage: chat_client <NAME> [DIR]");
        std::process::exit(1);
    };
    let dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp/fifo-relay"));

    let inbox_path = dir.join(format!("server_to_{}", name));
    let outbox_path = dir.join(format!("{}_to_server", name));

    // Register
    let registration = dir.join("registration_fifo");
    let mut rendezvous = pipe::OpenOptions::new().open_sender(&registration)?;
    rendezvous.write_all(format!("{}\n", name).as_bytes()).await?;
    drop(rendezvous);

    // Wait for the relay to create our FIFOs (they may be left from an
    // earlier session), then take the read end so the relay can open its
    // write end
    if !wait_for(&inbox_path, HANDSHAKE_TIMEOUT).await {
        not_accepted(&name);
    }
    let mut inbox = pipe::OpenOptions::new().open_receiver(&inbox_path)?;

    // A rejected registration gets no reply, so the marker never arrives
    let mut marker = [0u8; READY.len()];
    match tokio::time::timeout(HANDSHAKE_TIMEOUT, inbox.read_exact(&mut marker)).await {
        Ok(Ok(_)) if &marker[..] == READY => {}
        Ok(Ok(_)) | Err(_) => not_accepted(&name),
        Ok(Err(e)) => return Err(e.into()),
    }

    let mut outbox = pipe::OpenOptions::new().open_sender(&outbox_path)?;
    println!("[{}] Connected. Type messages, Ctrl-D to quit.", name);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut buf = [0u8; 256];

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                match line? {
                    Some(line) => {
                        outbox.write_all(format!("[{}] {}\n", name, line).as_bytes()).await?;
                    }
                    None => break,
                }
            }
            n = inbox.read(&mut buf) => {
                let n = n?;
                if n == 0 {
                    println!("[{}] Relay closed the channel", name);
                    break;
                }
                print!("{}", String::from_utf8_lossy(&buf[..n]));
            }
        }
    }

    Ok(())
}
