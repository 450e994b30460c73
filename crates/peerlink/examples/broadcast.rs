//! Server broadcasting to several clients at once.
//!
//! Run:
//! - cargo run -p peerlink --example broadcast

use std::{thread, time::Duration};

use peerlink::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let driver = MemoryDriver::new();
    let addr = "127.0.0.1:7878".parse().expect("static address");

    let server = Connection::create_host(&driver, HostConfig::server(addr))?;
    server.on(EventKind::Connect, |event| {
        println!("[server] {} joined", event.peer().address());
        Ok(())
    });
    server.start_event_loop()?;

    let clients: Vec<Connection> = (0..3u32)
        .map(|n| {
            let client = Connection::create_host(&driver, HostConfig::client())?;
            client.on(EventKind::Receive, move |event| {
                println!(
                    "[client {}] \"{}\" on channel {}",
                    n,
                    event.packet().expect("packet").as_text(),
                    event.channel()
                );
                Ok(())
            });
            client.start_event_loop()?;
            client.connect(addr, 2, n)?;
            Ok(client)
        })
        .collect::<Result<_>>()?;

    // Let the connects settle, then fan the same payload out to everyone.
    thread::sleep(Duration::from_millis(100));
    println!("[server] broadcasting to {} peers", server.peer_count());
    server.broadcast(0, b"state update")?;
    server.broadcast_with_flags(1, b"fast lane", PacketFlags::UNSEQUENCED)?;
    thread::sleep(Duration::from_millis(100));

    for client in clients {
        client.close();
    }
    server.close();
    Ok(())
}
