//! The checkpoint-side socket table: one entry per live socket inode, plus
//! the secondary icon index used to resolve in-flight connections.

use std::collections::HashMap;
use std::fmt;

/// Stream vs. datagram. Seqpacket and other UNIX socket shapes are a
/// non-goal (see the design's Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SockType {
    #[default]
    Stream,
    Dgram,
}

impl fmt::Display for SockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SockType::Stream => "stream",
            SockType::Dgram => "dgram",
        })
    }
}

/// The admitted subset of `TCP_*` states a UNIX socket can be collected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SockState {
    Listen,
    Established,
    #[default]
    Close,
}

impl fmt::Display for SockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SockState::Listen => "listen",
            SockState::Established => "established",
            SockState::Close => "close",
        })
    }
}

/// Address family for the thin INET side of the table (§4.8); only the
/// families this core cares about are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Inet,
    Inet6,
}

/// Transport protocol for the thin INET side of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    UdpLite,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::UdpLite => "udpl",
        })
    }
}

/// A collected UNIX domain socket, keyed by kernel inode.
///
/// Owned exclusively by the [`SocketTable`] from collection until the
/// program exits; `icons` lists the inodes of peers currently queued on
/// this socket's accept queue (only meaningful when `state == Listen`).
#[derive(Debug, Clone)]
pub struct UnixSkDesc {
    pub ino: u32,
    pub sk_type: SockType,
    pub state: SockState,
    pub peer_ino: u32,
    pub rqlen: u32,
    pub wqlen: u32,
    /// Bound name, raw wire bytes (leading `'\0'` ⇒ abstract). `None` means
    /// no name: either the socket was never bound, or its bound path was
    /// dropped because the backing inode had been unlinked (§4.1).
    pub name: Option<Vec<u8>>,
    pub icons: Vec<u32>,
    pub dumped: bool,
}

impl UnixSkDesc {
    pub fn new(ino: u32, sk_type: SockType, state: SockState) -> Self {
        UnixSkDesc {
            ino,
            sk_type,
            state,
            peer_ino: 0,
            rqlen: 0,
            wqlen: 0,
            name: None,
            icons: Vec::new(),
            dumped: false,
        }
    }
}

/// A collected INET socket. Only listening TCP is actually dump-admitted
/// today (§4.8); UDP/UDP-lite are collected so the table is complete but
/// whether that state is ever emitted is explicitly outside this core's
/// guarantees (design's Open Questions).
#[derive(Debug, Clone)]
pub struct InetSkDesc {
    pub ino: u32,
    pub family: Family,
    pub protocol: Protocol,
    pub sk_type: SockType,
    pub state: SockState,
    pub dumped: bool,
}

/// Tagged union over the families this core collects, replacing the
/// source's embedded-header-plus-downcast polymorphism (design note).
#[derive(Debug, Clone)]
pub enum SocketDesc {
    Unix(UnixSkDesc),
    Inet(InetSkDesc),
}

impl SocketDesc {
    pub fn ino(&self) -> u32 {
        match self {
            SocketDesc::Unix(u) => u.ino,
            SocketDesc::Inet(i) => i.ino,
        }
    }

    pub fn dumped(&self) -> bool {
        match self {
            SocketDesc::Unix(u) => u.dumped,
            SocketDesc::Inet(i) => i.dumped,
        }
    }

    pub fn set_dumped(&mut self, dumped: bool) {
        match self {
            SocketDesc::Unix(u) => u.dumped = dumped,
            SocketDesc::Inet(i) => i.dumped = dumped,
        }
    }

    pub fn as_unix(&self) -> Option<&UnixSkDesc> {
        match self {
            SocketDesc::Unix(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_unix_mut(&mut self) -> Option<&mut UnixSkDesc> {
        match self {
            SocketDesc::Unix(u) => Some(u),
            _ => None,
        }
    }
}

/// The checkpoint-side socket table: inode uniqueness is the invariant
/// (§3, invariant 1). Modeled as a plain `HashMap` per the design note —
/// no observable behavior depends on bucket count, so the source's
/// fixed-bucket chained hash maps collapse to the standard collection.
#[derive(Debug, Default)]
pub struct SocketTable {
    by_ino: HashMap<u32, SocketDesc>,
}

impl SocketTable {
    pub fn new() -> Self {
        SocketTable { by_ino: HashMap::new() }
    }

    /// Register a freshly collected descriptor under its inode.
    ///
    /// A duplicate inode overwrites the previous entry and is logged; the
    /// kernel guarantees inode uniqueness among live sockets, so this path
    /// is only hit by decoder bugs or a racing socket churn during dump.
    pub fn insert(&mut self, desc: SocketDesc) {
        let ino = desc.ino();
        if self.by_ino.insert(ino, desc).is_some() {
            tracing::warn!(ino, "duplicate socket inode collected, replacing prior entry");
        }
    }

    pub fn lookup(&self, ino: u32) -> Option<&SocketDesc> {
        self.by_ino.get(&ino)
    }

    pub fn lookup_mut(&mut self, ino: u32) -> Option<&mut SocketDesc> {
        self.by_ino.get_mut(&ino)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketDesc> {
        self.by_ino.values()
    }

    pub fn len(&self) -> usize {
        self.by_ino.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ino.is_empty()
    }
}

/// Secondary index from a queued peer's inode to the inode of the listening
/// socket whose accept queue it sits on (§3, `UnixListenIcon`).
///
/// Multiple listeners could in principle list the same peer inode (e.g. a
/// stale entry racing a new connection); new entries are prepended so a
/// lookup returns the most recently collected one first, mirroring the
/// source's hash-chain insertion order.
#[derive(Debug, Default)]
pub struct IconIndex {
    by_client_ino: HashMap<u32, Vec<u32>>,
}

impl IconIndex {
    pub fn new() -> Self {
        IconIndex { by_client_ino: HashMap::new() }
    }

    /// Record that `client_ino` is queued on the accept queue of the
    /// listening socket `listening_ino`.
    pub fn insert(&mut self, client_ino: u32, listening_ino: u32) {
        self.by_client_ino.entry(client_ino).or_default().insert(0, listening_ino);
    }

    /// The listening socket's inode whose accept queue holds `client_ino`,
    /// if any (§8 testable property).
    pub fn lookup(&self, client_ino: u32) -> Option<u32> {
        self.by_client_ino.get(&client_ino).and_then(|v| v.first().copied())
    }
}
