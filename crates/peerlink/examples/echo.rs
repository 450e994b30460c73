//! Echo server and client over the in-process loopback transport.
//!
//! Run:
//! - cargo run -p peerlink --example echo
//! - RUST_LOG=peerlink=debug cargo run -p peerlink --example echo

use std::{sync::Arc, thread, time::Duration};

use peerlink::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let driver = MemoryDriver::new();
    let addr = "127.0.0.1:7777".parse().expect("static address");

    // Server: echo every packet back on the channel it arrived on.
    let server = Arc::new(Connection::create_host(&driver, HostConfig::server(addr))?);
    server.on(EventKind::Connect, |event| {
        println!("[server] connect from {}", event.peer().address());
        Ok(())
    });
    let echo_target = Arc::downgrade(&server);
    server.on(EventKind::Receive, move |event| {
        let packet = event.packet().expect("receive event carries a packet");
        println!("[server] \"{}\" from {}", packet.as_text(), event.peer());
        if let Some(server) = echo_target.upgrade() {
            server.send(event.peer(), event.channel(), packet.payload())?;
        }
        Ok(())
    });
    server.on(EventKind::Disconnect, |event| {
        println!("[server] {} left (data={})", event.peer(), event.data());
        Ok(())
    });
    server.start_event_loop()?;

    // Client: send a few messages, print the echoes.
    let client = Connection::create_host(&driver, HostConfig::client())?;
    client.on(EventKind::Receive, |event| {
        println!("[client] echo: \"{}\"", event.packet().expect("packet").as_text());
        Ok(())
    });
    client.start_event_loop()?;

    let peer = client.connect(addr, 1, 0)?;
    for i in 0..5 {
        client.send(&peer, 0, format!("hello {}", i).as_bytes())?;
        thread::sleep(Duration::from_millis(50));
    }
    client.flush()?;
    client.disconnect_peer(&peer, 0)?;
    thread::sleep(Duration::from_millis(100));

    client.close();
    server.close();
    Ok(())
}
