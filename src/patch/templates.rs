//! Source text spliced into the Brezn crate, one block per catalog feature.
//!
//! Each body is wrapped in its own module so its imports cannot collide with
//! the host file. Bodies must keep satisfying their feature's detection rule
//! (see `catalog.rs`), otherwise an applied patch would still read as pending.

pub const P2P_PEER_DISCOVERY_MARKER: &str = "UDP BROADCAST PEER DISCOVERY IMPLEMENTATION";

pub const P2P_PEER_DISCOVERY: &str = r##"
pub mod udp_discovery {
    use std::collections::HashMap;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Serialize};
    use tokio::net::UdpSocket;

    pub const DISCOVERY_PORT: u16 = 8888;
    pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
    /// Peers silent for longer than this are dropped from the registry.
    pub const PEER_TIMEOUT_SECS: u64 = 90;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum DiscoveryMessage {
        Announce {
            node_id: String,
            public_key: String,
            port: u16,
            timestamp: u64,
        },
        Ping { node_id: String, timestamp: u64 },
        Pong { node_id: String, timestamp: u64 },
    }

    #[derive(Debug, Clone)]
    pub struct RegisteredPeer {
        pub node_id: String,
        pub public_key: String,
        pub address: SocketAddr,
        pub last_seen: u64,
    }

    #[derive(Debug, Default)]
    pub struct PeerRegistry {
        peers: HashMap<String, RegisteredPeer>,
    }

    impl PeerRegistry {
        pub fn upsert(&mut self, peer: RegisteredPeer) -> bool {
            self.peers.insert(peer.node_id.clone(), peer).is_none()
        }

        pub fn touch(&mut self, node_id: &str, now: u64) {
            if let Some(peer) = self.peers.get_mut(node_id) {
                peer.last_seen = now;
            }
        }

        pub fn prune_stale(&mut self, now: u64) -> Vec<String> {
            let stale: Vec<String> = self
                .peers
                .values()
                .filter(|p| now.saturating_sub(p.last_seen) > PEER_TIMEOUT_SECS)
                .map(|p| p.node_id.clone())
                .collect();
            for id in &stale {
                self.peers.remove(id);
            }
            stale
        }

        pub fn addresses(&self) -> Vec<SocketAddr> {
            self.peers.values().map(|p| p.address).collect()
        }

        pub fn len(&self) -> usize {
            self.peers.len()
        }

        pub fn is_empty(&self) -> bool {
            self.peers.is_empty()
        }
    }

    pub struct UdpDiscovery {
        node_id: String,
        public_key: String,
        port: u16,
        socket: UdpSocket,
        peer_registry: Arc<Mutex<PeerRegistry>>,
    }

    impl UdpDiscovery {
        pub async fn bind(node_id: String, public_key: String, port: u16) -> anyhow::Result<Self> {
            let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
            socket.set_broadcast(true)?;
            Ok(Self {
                node_id,
                public_key,
                port,
                socket,
                peer_registry: Arc::new(Mutex::new(PeerRegistry::default())),
            })
        }

        pub fn peer_registry(&self) -> Arc<Mutex<PeerRegistry>> {
            Arc::clone(&self.peer_registry)
        }

        /// Announces this node to the local network via UDP broadcast.
        pub async fn announce(&self) -> anyhow::Result<()> {
            let msg = DiscoveryMessage::Announce {
                node_id: self.node_id.clone(),
                public_key: self.public_key.clone(),
                port: self.port,
                timestamp: unix_now(),
            };
            let target = SocketAddr::new(Ipv4Addr::BROADCAST.into(), self.port);
            self.socket.send_to(&serde_json::to_vec(&msg)?, target).await?;
            Ok(())
        }

        /// Sends a heartbeat ping to every registered peer and prunes silent ones.
        pub async fn send_heartbeat(&self) -> anyhow::Result<()> {
            let now = unix_now();
            let addresses = {
                let mut registry = self.peer_registry.lock().unwrap();
                for id in registry.prune_stale(now) {
                    println!("peer timed out: {id}");
                }
                registry.addresses()
            };
            let ping = serde_json::to_vec(&DiscoveryMessage::Ping {
                node_id: self.node_id.clone(),
                timestamp: now,
            })?;
            for addr in addresses {
                self.socket.send_to(&ping, addr).await?;
            }
            Ok(())
        }

        pub async fn handle_datagram(&self, bytes: &[u8], from: SocketAddr) -> anyhow::Result<()> {
            let msg: DiscoveryMessage = serde_json::from_slice(bytes)?;
            let now = unix_now();
            match msg {
                DiscoveryMessage::Announce { node_id, public_key, .. } => {
                    if node_id == self.node_id {
                        return Ok(());
                    }
                    let peer = RegisteredPeer {
                        node_id: node_id.clone(),
                        public_key,
                        address: from,
                        last_seen: now,
                    };
                    if self.peer_registry.lock().unwrap().upsert(peer) {
                        println!("discovered peer {node_id} at {from}");
                    }
                }
                DiscoveryMessage::Ping { node_id, .. } => {
                    self.peer_registry.lock().unwrap().touch(&node_id, now);
                    let pong = serde_json::to_vec(&DiscoveryMessage::Pong {
                        node_id: self.node_id.clone(),
                        timestamp: now,
                    })?;
                    self.socket.send_to(&pong, from).await?;
                }
                DiscoveryMessage::Pong { node_id, .. } => {
                    self.peer_registry.lock().unwrap().touch(&node_id, now);
                }
            }
            Ok(())
        }

        /// Announces once, then serves datagrams and heartbeats until an error occurs.
        pub async fn run(&self) -> anyhow::Result<()> {
            self.announce().await?;
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            let mut buffer = [0u8; 2048];
            loop {
                tokio::select! {
                    _ = heartbeat.tick() => self.send_heartbeat().await?,
                    received = self.socket.recv_from(&mut buffer) => {
                        let (len, from) = received?;
                        if let Err(e) = self.handle_datagram(&buffer[..len], from).await {
                            eprintln!("ignoring datagram from {from}: {e}");
                        }
                    }
                }
            }
        }
    }

    fn unix_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}
"##;

pub const TOR_INTEGRATION_MARKER: &str = "SOCKS5 PROXY INTEGRATION IMPLEMENTATION";

pub const TOR_INTEGRATION: &str = r##"
/// Tor proxy integration: outbound connections tunnelled through the local
/// SOCKS5 port so every circuit is built by the Tor daemon.
pub mod socks5_proxy {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    pub const SOCKS_VERSION: u8 = 0x05;
    const NO_AUTH: u8 = 0x00;
    const CMD_CONNECT: u8 = 0x01;
    const ATYP_DOMAIN: u8 = 0x03;
    const REPLY_SUCCEEDED: u8 = 0x00;

    #[derive(Debug, Clone)]
    pub struct ProxyConfig {
        pub socks_host: String,
        pub socks_port: u16,
    }

    impl Default for ProxyConfig {
        fn default() -> Self {
            Self {
                socks_host: "127.0.0.1".to_string(),
                socks_port: 9050,
            }
        }
    }

    /// Opens a stream to `host:port` routed through Tor (tor_routing via SOCKS5 CONNECT).
    pub async fn connect_via_socks5(
        config: &ProxyConfig,
        host: &str,
        port: u16,
    ) -> anyhow::Result<TcpStream> {
        let mut stream = TcpStream::connect((config.socks_host.as_str(), config.socks_port)).await?;

        stream.write_all(&[SOCKS_VERSION, 0x01, NO_AUTH]).await?;
        let mut method = [0u8; 2];
        stream.read_exact(&mut method).await?;
        if method != [SOCKS_VERSION, NO_AUTH] {
            anyhow::bail!("SOCKS5 handshake rejected: {method:?}");
        }

        stream.write_all(&build_connect_request(host, port)?).await?;
        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).await?;
        if reply[1] != REPLY_SUCCEEDED {
            anyhow::bail!("SOCKS5 connect failed with reply code {:#04x}", reply[1]);
        }
        skip_bound_address(&mut stream, reply[3]).await?;

        Ok(stream)
    }

    pub fn build_connect_request(host: &str, port: u16) -> anyhow::Result<Vec<u8>> {
        let host_bytes = host.as_bytes();
        let len = u8::try_from(host_bytes.len())
            .map_err(|_| anyhow::anyhow!("hostname too long for SOCKS5: {host}"))?;
        let mut request = vec![SOCKS_VERSION, CMD_CONNECT, 0x00, ATYP_DOMAIN, len];
        request.extend_from_slice(host_bytes);
        request.extend_from_slice(&port.to_be_bytes());
        Ok(request)
    }

    async fn skip_bound_address(stream: &mut TcpStream, atyp: u8) -> anyhow::Result<()> {
        let addr_len = match atyp {
            0x01 => 4,
            0x04 => 16,
            ATYP_DOMAIN => usize::from(stream.read_u8().await?),
            other => anyhow::bail!("unknown SOCKS5 address type {other:#04x}"),
        };
        let mut rest = vec![0u8; addr_len + 2];
        stream.read_exact(&mut rest).await?;
        Ok(())
    }
}
"##;

pub const QR_CODE_MARKER: &str = "QR CODE IMPLEMENTATION";

pub const QR_CODE: &str = r##"
pub mod qr_join {
    use std::time::{SystemTime, UNIX_EPOCH};

    use qrcode::render::svg;
    use qrcode::QrCode;
    use serde::{Deserialize, Serialize};

    /// Join tickets older than this are refused.
    pub const TICKET_TTL_SECS: u64 = 3600;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct JoinTicket {
        pub node_id: String,
        pub public_key: String,
        pub address: String,
        pub port: u16,
        pub capabilities: Vec<String>,
        pub timestamp: u64,
    }

    /// Renders a join ticket as an SVG qr_code (generate side).
    pub fn generate_qr_code(ticket: &JoinTicket) -> anyhow::Result<String> {
        let payload = serde_json::to_string(ticket)?;
        let code = QrCode::new(payload.as_bytes())?;
        Ok(code
            .render()
            .min_dimensions(200, 200)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build())
    }

    /// Decodes the text scanned from a qr_code (parse side) and checks its age.
    pub fn parse_qr_code(payload: &str, now: u64) -> anyhow::Result<JoinTicket> {
        let ticket: JoinTicket = serde_json::from_str(payload)?;
        if now.saturating_sub(ticket.timestamp) > TICKET_TTL_SECS {
            anyhow::bail!("join ticket from {} has expired", ticket.node_id);
        }
        if ticket.node_id.is_empty() || ticket.public_key.is_empty() {
            anyhow::bail!("join ticket is missing node identity");
        }
        Ok(ticket)
    }

    /// Validates a scanned ticket and hands it to `register` to join_network.
    pub fn join_network<F>(payload: &str, register: F) -> anyhow::Result<JoinTicket>
    where
        F: FnOnce(&JoinTicket) -> anyhow::Result<()>,
    {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let ticket = parse_qr_code(payload, now)?;
        register(&ticket)?;
        println!("peer joined via QR: {}", ticket.node_id);
        Ok(ticket)
    }
}
"##;
