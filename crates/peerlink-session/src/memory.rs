//! In-process loopback transport.
//!
//! A `MemoryDriver` is an isolated network: hosts created through the same
//! driver can reach each other by bound address, with events delivered over
//! crossbeam channels. Delivery is synchronous with the send call, so
//! `flush` is a no-op and the reliability flags are accepted but moot.
//! Intended for integration tests and examples; it honors the same
//! contract a real network transport would, including asynchronous refusal:
//! connecting to a full host yields a `Disconnect` event rather than an
//! error.

use std::{
    collections::HashMap,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use peerlink_core::{
    config::HostConfig,
    error::{ErrorKind, Result},
    event::Event,
    flags::PacketFlags,
    packet::Packet,
    peer::{Peer, PeerHandle},
    transport::{TransportDriver, TransportHost},
};
use tracing::debug;

type HostId = u64;

/// First port handed out to unbound hosts.
const EPHEMERAL_BASE: u16 = 40000;
/// Number of ports in the ephemeral range before allocation wraps.
const EPHEMERAL_SPAN: u16 = u16::MAX - EPHEMERAL_BASE + 1;

/// One side of an established peer pair.
struct PeerLink {
    remote_host: HostId,
    /// The handle under which the remote side knows us.
    remote_peer: PeerHandle,
    /// Channels negotiated for this connection.
    channels: u8,
}

struct HostEntry {
    addr: SocketAddr,
    events: Sender<Event>,
    peers: HashMap<PeerHandle, PeerLink>,
    max_peers: usize,
}

#[derive(Default)]
struct Network {
    hosts: HashMap<HostId, HostEntry>,
    by_addr: HashMap<SocketAddr, HostId>,
    next_host: HostId,
    next_peer: u64,
    next_ephemeral_port: u16,
}

impl Network {
    fn allocate_peer(&mut self) -> PeerHandle {
        self.next_peer += 1;
        PeerHandle(self.next_peer)
    }

    fn ephemeral_addr(&mut self) -> SocketAddr {
        loop {
            let port = EPHEMERAL_BASE + self.next_ephemeral_port;
            self.next_ephemeral_port = (self.next_ephemeral_port + 1) % EPHEMERAL_SPAN;
            let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port));
            if !self.by_addr.contains_key(&addr) {
                return addr;
            }
        }
    }
}

/// Transport driver backed by in-process channels.
pub struct MemoryDriver {
    network: Arc<Mutex<Network>>,
}

impl MemoryDriver {
    /// Creates a new, empty loopback network.
    pub fn new() -> Self {
        Self { network: Arc::new(Mutex::new(Network::default())) }
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportDriver for MemoryDriver {
    fn global_init(&self) -> Result<()> {
        Ok(())
    }

    fn global_deinit(&self) {}

    fn create_host(&self, config: &HostConfig) -> Result<Box<dyn TransportHost>> {
        let mut net = self.network.lock();
        let addr = match config.bind {
            Some(addr) => {
                if net.by_addr.contains_key(&addr) {
                    return Err(ErrorKind::HostCreation(format!("address {} is already in use", addr)));
                }
                addr
            }
            None => net.ephemeral_addr(),
        };
        let id = net.next_host;
        net.next_host += 1;
        let (events, receiver) = unbounded();
        net.hosts.insert(
            id,
            HostEntry { addr, events, peers: HashMap::new(), max_peers: config.max_peers },
        );
        net.by_addr.insert(addr, id);
        debug!("memory host {} bound to {}", id, addr);
        Ok(Box::new(MemoryHost { id, addr, network: self.network.clone(), events: receiver }))
    }
}

/// A loopback host endpoint. Dropping it tears down its peer links and
/// notifies the remotes with `Disconnect` events.
pub struct MemoryHost {
    id: HostId,
    addr: SocketAddr,
    network: Arc<Mutex<Network>>,
    events: Receiver<Event>,
}

impl MemoryHost {
    fn entry<'a>(&self, net: &'a Network) -> &'a HostEntry {
        net.hosts.get(&self.id).expect("host entry must exist while the handle is alive")
    }
}

impl TransportHost for MemoryHost {
    fn connect(&self, address: SocketAddr, channel_count: u8, user_data: u32) -> Result<Peer> {
        let mut net = self.network.lock();
        let remote_id = *net
            .by_addr
            .get(&address)
            .ok_or_else(|| ErrorKind::Connect(format!("no host listening on {}", address)))?;
        let channels = channel_count.max(1);

        let local_handle = net.allocate_peer();
        let local_peer = Peer::new(local_handle, address);

        let remote = net.hosts.get(&remote_id).expect("listed host must exist");
        if remote.max_peers > 0 && remote.peers.len() >= remote.max_peers {
            // The attempt itself succeeds; the remote turns it away, which
            // the caller observes as a Disconnect event.
            let entry = self.entry(&net);
            let _ = entry.events.send(Event::Disconnect { peer: local_peer.clone(), data: 0 });
            return Ok(local_peer);
        }

        let remote_handle = net.allocate_peer();
        let remote_peer_view = Peer::new(remote_handle, self.addr);

        let remote = net.hosts.get_mut(&remote_id).expect("listed host must exist");
        remote.peers.insert(
            remote_handle,
            PeerLink { remote_host: self.id, remote_peer: local_handle, channels },
        );
        let _ = remote.events.send(Event::Connect { peer: remote_peer_view, data: user_data });

        let local = net.hosts.get_mut(&self.id).expect("host entry must exist while the handle is alive");
        local.peers.insert(
            local_handle,
            PeerLink { remote_host: remote_id, remote_peer: remote_handle, channels },
        );
        let _ = local.events.send(Event::Connect { peer: local_peer.clone(), data: user_data });

        Ok(local_peer)
    }

    fn poll(&self, timeout: Duration) -> Result<Option<Event>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn send(&self, peer: &Peer, channel: u8, payload: &[u8], flags: PacketFlags) -> Result<()> {
        let net = self.network.lock();
        let entry = self.entry(&net);
        let link = entry
            .peers
            .get(&peer.handle())
            .ok_or_else(|| ErrorKind::SendRejected(format!("{} is not connected", peer)))?;
        if channel >= link.channels {
            return Err(ErrorKind::SendRejected(format!(
                "channel {} out of range (connection has {})",
                channel, link.channels
            )));
        }
        let remote = net
            .hosts
            .get(&link.remote_host)
            .ok_or_else(|| ErrorKind::SendRejected(format!("{} is gone", peer)))?;
        let event = Event::Receive {
            peer: Peer::new(link.remote_peer, entry.addr),
            channel,
            packet: Packet::new(payload.to_vec(), flags),
        };
        let _ = remote.events.send(event);
        Ok(())
    }

    fn broadcast(&self, channel: u8, payload: &[u8], flags: PacketFlags) -> Result<()> {
        let net = self.network.lock();
        let entry = self.entry(&net);
        // One shared buffer across the whole fan-out.
        let shared: Arc<[u8]> = Arc::from(payload.to_vec());
        for link in entry.peers.values() {
            if channel >= link.channels {
                continue;
            }
            if let Some(remote) = net.hosts.get(&link.remote_host) {
                let event = Event::Receive {
                    peer: Peer::new(link.remote_peer, entry.addr),
                    channel,
                    packet: Packet::new(shared.clone(), flags),
                };
                let _ = remote.events.send(event);
            }
        }
        Ok(())
    }

    fn flush(&self) {
        // Delivery is synchronous with the send call.
    }

    fn disconnect(&self, peer: &Peer, user_data: u32) -> Result<()> {
        let mut net = self.network.lock();
        let (link, our_addr) = {
            let entry = net
                .hosts
                .get_mut(&self.id)
                .expect("host entry must exist while the handle is alive");
            let link = entry
                .peers
                .remove(&peer.handle())
                .ok_or_else(|| ErrorKind::SendRejected(format!("{} is not connected", peer)))?;
            let _ = entry.events.send(Event::Disconnect { peer: peer.clone(), data: user_data });
            (link, entry.addr)
        };
        if let Some(remote) = net.hosts.get_mut(&link.remote_host) {
            remote.peers.remove(&link.remote_peer);
            let _ = remote.events.send(Event::Disconnect {
                peer: Peer::new(link.remote_peer, our_addr),
                data: user_data,
            });
        }
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.addr)
    }

    fn peer_count(&self) -> usize {
        let net = self.network.lock();
        self.entry(&net).peers.len()
    }
}

impl Drop for MemoryHost {
    fn drop(&mut self) {
        let mut net = self.network.lock();
        if let Some(entry) = net.hosts.remove(&self.id) {
            net.by_addr.remove(&entry.addr);
            for link in entry.peers.values() {
                if let Some(remote) = net.hosts.get_mut(&link.remote_host) {
                    remote.peers.remove(&link.remote_peer);
                    let _ = remote.events.send(Event::Disconnect {
                        peer: Peer::new(link.remote_peer, entry.addr),
                        data: 0,
                    });
                }
            }
            debug!("memory host {} released", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use peerlink_core::event::EventKind;

    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    fn poll_now(host: &dyn TransportHost) -> Option<Event> {
        host.poll(Duration::from_millis(50)).unwrap()
    }

    #[test]
    fn ephemeral_allocation_wraps_within_the_port_range() {
        let mut net = Network::default();
        net.next_ephemeral_port = EPHEMERAL_SPAN - 1;

        let last = net.ephemeral_addr();
        let wrapped = net.ephemeral_addr();

        assert_eq!(last.port(), u16::MAX);
        assert_eq!(wrapped.port(), EPHEMERAL_BASE);
    }

    #[test]
    fn binding_a_taken_address_fails() {
        let driver = MemoryDriver::new();
        let config = HostConfig::server(addr(7000));
        let _first = driver.create_host(&config).unwrap();
        let second = driver.create_host(&config);
        assert!(matches!(second, Err(ErrorKind::HostCreation(_))));
    }

    #[test]
    fn address_is_reusable_after_host_drop() {
        let driver = MemoryDriver::new();
        let config = HostConfig::server(addr(7001));
        drop(driver.create_host(&config).unwrap());
        assert!(driver.create_host(&config).is_ok());
    }

    #[test]
    fn connect_to_missing_host_is_rejected_locally() {
        let driver = MemoryDriver::new();
        let client = driver.create_host(&HostConfig::client()).unwrap();
        let result = client.connect(addr(7999), 1, 0);
        assert!(matches!(result, Err(ErrorKind::Connect(_))));
    }

    #[test]
    fn connect_emits_connect_events_on_both_sides() {
        let driver = MemoryDriver::new();
        let server = driver.create_host(&HostConfig::server(addr(7002))).unwrap();
        let client = driver.create_host(&HostConfig::client()).unwrap();

        let peer = client.connect(addr(7002), 2, 77).unwrap();

        let client_side = poll_now(client.as_ref()).unwrap();
        assert_eq!(client_side.kind(), EventKind::Connect);
        assert_eq!(client_side.peer(), &peer);

        let server_side = poll_now(server.as_ref()).unwrap();
        assert_eq!(server_side.kind(), EventKind::Connect);
        assert_eq!(server_side.data(), 77);
        assert_eq!(server.peer_count(), 1);
    }

    #[test]
    fn full_host_refuses_asynchronously() {
        let driver = MemoryDriver::new();
        let config = HostConfig { max_peers: 1, ..HostConfig::server(addr(7003)) };
        let _server = driver.create_host(&config).unwrap();

        let first = driver.create_host(&HostConfig::client()).unwrap();
        first.connect(addr(7003), 1, 0).unwrap();

        let second = driver.create_host(&HostConfig::client()).unwrap();
        second.connect(addr(7003), 1, 0).unwrap();

        let refusal = poll_now(second.as_ref()).unwrap();
        assert_eq!(refusal.kind(), EventKind::Disconnect);
    }

    #[test]
    fn send_on_invalid_channel_is_rejected() {
        let driver = MemoryDriver::new();
        let _server = driver.create_host(&HostConfig::server(addr(7004))).unwrap();
        let client = driver.create_host(&HostConfig::client()).unwrap();
        let peer = client.connect(addr(7004), 2, 0).unwrap();

        let result = client.send(&peer, 5, b"nope", PacketFlags::RELIABLE);
        assert!(matches!(result, Err(ErrorKind::SendRejected(_))));
    }

    #[test]
    fn send_to_unknown_peer_is_rejected() {
        let driver = MemoryDriver::new();
        let client = driver.create_host(&HostConfig::client()).unwrap();
        let stranger = Peer::new(PeerHandle(999), addr(7005));
        let result = client.send(&stranger, 0, b"hello?", PacketFlags::RELIABLE);
        assert!(matches!(result, Err(ErrorKind::SendRejected(_))));
    }

    #[test]
    fn payload_round_trips_unchanged() {
        let driver = MemoryDriver::new();
        let server = driver.create_host(&HostConfig::server(addr(7006))).unwrap();
        let client = driver.create_host(&HostConfig::client()).unwrap();
        let peer = client.connect(addr(7006), 1, 0).unwrap();
        poll_now(client.as_ref());
        poll_now(server.as_ref());

        let payload = b"ping\0garbage".to_vec();
        client.send(&peer, 0, &payload, PacketFlags::RELIABLE).unwrap();

        let received = poll_now(server.as_ref()).unwrap();
        let packet = received.packet().unwrap();
        assert_eq!(packet.payload(), payload.as_slice());
        assert_eq!(packet.as_text(), "ping");
    }

    #[test]
    fn disconnect_notifies_both_sides_and_invalidates_the_link() {
        let driver = MemoryDriver::new();
        let server = driver.create_host(&HostConfig::server(addr(7007))).unwrap();
        let client = driver.create_host(&HostConfig::client()).unwrap();
        let peer = client.connect(addr(7007), 1, 0).unwrap();
        poll_now(client.as_ref());
        poll_now(server.as_ref());

        client.disconnect(&peer, 31).unwrap();

        let local = poll_now(client.as_ref()).unwrap();
        assert_eq!(local.kind(), EventKind::Disconnect);
        assert_eq!(local.data(), 31);

        let remote = poll_now(server.as_ref()).unwrap();
        assert_eq!(remote.kind(), EventKind::Disconnect);
        assert_eq!(remote.data(), 31);

        let late = client.send(&peer, 0, b"too late", PacketFlags::RELIABLE);
        assert!(matches!(late, Err(ErrorKind::SendRejected(_))));
    }

    #[test]
    fn dropping_a_host_disconnects_its_peers() {
        let driver = MemoryDriver::new();
        let server = driver.create_host(&HostConfig::server(addr(7008))).unwrap();
        let client = driver.create_host(&HostConfig::client()).unwrap();
        client.connect(addr(7008), 1, 0).unwrap();
        poll_now(server.as_ref());

        drop(client);

        let notice = poll_now(server.as_ref()).unwrap();
        assert_eq!(notice.kind(), EventKind::Disconnect);
        assert_eq!(server.peer_count(), 0);
    }
}
