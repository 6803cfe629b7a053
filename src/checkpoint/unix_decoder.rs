//! UNIX diagnostic decoder (§4.1): turns one `UNIX_DIAG` netlink message's
//! route-attribute TLVs into a registered [`UnixSkDesc`], or a clean
//! rejection with zero side effects on the socket table.

use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::checkpoint::table::{IconIndex, SockState, SockType, SocketDesc, SocketTable, UnixSkDesc};
use crate::error::{Error, Result};
use crate::netlink::{self, unix_diag_attr, tcp_state, DumpControl, UnixDiagReq};

/// One decoded `UNIX_DIAG` attribute set, split out of one raw netlink
/// message's route-attribute TLVs by [`decode_unix_diag_message`] — this
/// module only interprets the attribute values, never the netlink framing
/// around them (that's [`crate::netlink`]'s job).
#[derive(Debug, Default)]
pub struct UnixDiagAttrs {
    pub ino: u32,
    pub sk_type: SockType,
    pub state: SockState,
    pub peer: Option<u32>,
    pub name: Option<Vec<u8>>,
    pub vfs: Option<(u64, u64)>,
    pub icons: Vec<u32>,
    pub rqlen: u32,
    pub wqlen: u32,
}

/// Decode one `UnixDiagAttrs` set into a registered `UnixSkDesc`, mutating
/// `table` and `icons` on success. `stat_path` is injected so tests can
/// avoid touching the real filesystem; production callers pass
/// [`std::fs::metadata`].
pub fn decode_unix_diag<F>(
    attrs: UnixDiagAttrs,
    table: &mut SocketTable,
    icons: &mut IconIndex,
    stat_path: F,
) -> Result<()>
where
    F: Fn(&Path) -> std::io::Result<(u64, u64)>,
{
    let mut desc = UnixSkDesc::new(attrs.ino, attrs.sk_type, attrs.state);
    desc.rqlen = attrs.rqlen;
    desc.wqlen = attrs.wqlen;
    desc.peer_ino = attrs.peer.unwrap_or(0);

    if let Some(name) = attrs.name {
        match classify_name(&name) {
            NameShape::Abstract => desc.name = Some(name),
            NameShape::Relative => {
                tracing::warn!(ino = attrs.ino, "socket has a relative-path name, dropping socket");
                return Ok(());
            }
            NameShape::Absolute => {
                let (dev, ino) = attrs.vfs.ok_or_else(|| {
                    Error::unsupported(format!("socket {:#x}: absolute name without VFS attribute", attrs.ino))
                })?;
                let path = Path::new(std::ffi::OsStr::from_bytes(&name));
                match stat_path(path) {
                    Ok((st_dev, st_ino)) if st_dev == dev && st_ino == ino => {
                        desc.name = Some(name);
                    }
                    _ => {
                        // The path has been unlinked since bind: no peer can
                        // reach this socket by name any more (§4.1).
                        desc.name = None;
                    }
                }
            }
        }
    }

    for peer_ino in attrs.icons {
        icons.insert(peer_ino, attrs.ino);
    }
    desc.icons = Vec::new(); // icons live in the secondary index, not the desc itself

    table.insert(SocketDesc::Unix(desc));
    Ok(())
}

enum NameShape {
    Abstract,
    Relative,
    Absolute,
}

fn classify_name(name: &[u8]) -> NameShape {
    match name.first() {
        None | Some(b'\0') => NameShape::Abstract,
        Some(b'/') => NameShape::Absolute,
        Some(_) => NameShape::Relative,
    }
}

/// Production `stat_path` implementation using real filesystem metadata.
pub fn stat_path_real(path: &Path) -> std::io::Result<(u64, u64)> {
    let meta = std::fs::metadata(path)?;
    Ok((meta.dev(), meta.ino()))
}

fn sock_type_from_raw(raw: u8, ino: u32) -> Result<SockType> {
    match raw as i32 {
        libc::SOCK_STREAM => Ok(SockType::Stream),
        libc::SOCK_DGRAM => Ok(SockType::Dgram),
        other => Err(Error::unsupported(format!("socket {ino:#x}: unsupported raw sk_type {other}"))),
    }
}

fn sock_state_from_raw(raw: u8) -> SockState {
    match raw {
        tcp_state::ESTABLISHED => SockState::Established,
        tcp_state::LISTEN => SockState::Listen,
        _ => SockState::Close,
    }
}

/// Decode the route-attribute TLVs following a fixed `struct unix_diag_msg`
/// header (§4.1's actual netlink wire input) into a [`UnixDiagAttrs`] and
/// register it via [`decode_unix_diag`].
///
/// `msg` is the payload of one `SOCK_DIAG_BY_FAMILY`/UNIX_DIAG dump message,
/// as handed to [`crate::netlink::run_dump`]'s decode callback — i.e.
/// everything after the outer `nlmsghdr`, starting at the family header.
pub fn decode_unix_diag_message<F>(
    msg: &[u8],
    table: &mut SocketTable,
    icons: &mut IconIndex,
    stat_path: F,
) -> Result<()>
where
    F: Fn(&Path) -> std::io::Result<(u64, u64)>,
{
    if msg.len() < netlink::UNIX_DIAG_MSG_LEN {
        return Err(Error::graph("truncated unix_diag_msg"));
    }

    let ino = u32::from_ne_bytes(msg[4..8].try_into().unwrap());
    let mut attrs = UnixDiagAttrs {
        ino,
        sk_type: sock_type_from_raw(msg[1], ino)?,
        state: sock_state_from_raw(msg[2]),
        ..Default::default()
    };

    for attr in netlink::iter_rtattrs(&msg[netlink::UNIX_DIAG_MSG_LEN..]) {
        match attr.rta_type {
            unix_diag_attr::NAME => attrs.name = Some(attr.payload.to_vec()),
            unix_diag_attr::VFS if attr.payload.len() >= 8 => {
                let dev = u32::from_ne_bytes(attr.payload[0..4].try_into().unwrap());
                let vfs_ino = u32::from_ne_bytes(attr.payload[4..8].try_into().unwrap());
                attrs.vfs = Some((dev as u64, vfs_ino as u64));
            }
            unix_diag_attr::PEER if attr.payload.len() >= 4 => {
                attrs.peer = Some(u32::from_ne_bytes(attr.payload[0..4].try_into().unwrap()));
            }
            unix_diag_attr::ICONS => {
                attrs.icons = attr
                    .payload
                    .chunks_exact(4)
                    .map(|c| u32::from_ne_bytes(c.try_into().unwrap()))
                    .collect();
            }
            unix_diag_attr::RQLEN if attr.payload.len() >= 8 => {
                attrs.rqlen = u32::from_ne_bytes(attr.payload[0..4].try_into().unwrap());
                attrs.wqlen = u32::from_ne_bytes(attr.payload[4..8].try_into().unwrap());
            }
            _ => {}
        }
    }

    decode_unix_diag(attrs, table, icons, stat_path)
}

/// Drive a full UNIX socket dump over `sock` (an already-bound
/// `NETLINK_SOCK_DIAG` socket), decoding every reply message via
/// [`decode_unix_diag_message`] (§2 step 1: netlink collector → UNIX
/// decoder). Production entry point; see
/// [`collect_unix_sockets_with`] for the test-injectable `stat_path` form.
pub fn collect_unix_sockets<S: AsRawFd>(sock: &S, table: &mut SocketTable, icons: &mut IconIndex) -> Result<()> {
    collect_unix_sockets_with(sock, table, icons, stat_path_real)
}

/// As [`collect_unix_sockets`], with an injectable `stat_path` so tests
/// don't need real filesystem state to exercise the dump.
pub fn collect_unix_sockets_with<S, F>(
    sock: &S,
    table: &mut SocketTable,
    icons: &mut IconIndex,
    stat_path: F,
) -> Result<()>
where
    S: AsRawFd,
    F: Fn(&Path) -> std::io::Result<(u64, u64)>,
{
    let request = netlink::build_request(1, &UnixDiagReq::dump_all());
    let mut first_err: Option<Error> = None;

    netlink::run_dump(sock, &request, |payload| {
        match decode_unix_diag_message(payload, table, icons, &stat_path) {
            Ok(()) => Ok(DumpControl::Continue),
            Err(e) => {
                first_err = Some(e);
                Ok(DumpControl::Stop)
            }
        }
    })
    .map_err(Error::Transport)?;

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(ino: u32) -> UnixDiagAttrs {
        UnixDiagAttrs {
            ino,
            sk_type: SockType::Stream,
            state: SockState::Listen,
            peer: None,
            name: None,
            vfs: None,
            icons: Vec::new(),
            rqlen: 0,
            wqlen: 0,
        }
    }

    #[test]
    fn registers_nameless_socket() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        decode_unix_diag(attrs(1), &mut table, &mut icons, |_| unreachable!()).unwrap();
        assert!(table.lookup(1).is_some());
    }

    #[test]
    fn abstract_name_is_kept_without_stat() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let mut a = attrs(2);
        a.name = Some(b"\0abstract".to_vec());
        decode_unix_diag(a, &mut table, &mut icons, |_| unreachable!()).unwrap();
        let desc = table.lookup(2).unwrap().as_unix().unwrap();
        assert_eq!(desc.name.as_deref(), Some(&b"\0abstract"[..]));
    }

    #[test]
    fn relative_path_drops_the_socket_without_error() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let mut a = attrs(3);
        a.name = Some(b"relative/path".to_vec());
        decode_unix_diag(a, &mut table, &mut icons, |_| unreachable!()).unwrap();
        assert!(table.lookup(3).is_none());
    }

    #[test]
    fn absolute_path_requires_vfs_attribute() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let mut a = attrs(4);
        a.name = Some(b"/tmp/sock".to_vec());
        assert!(decode_unix_diag(a, &mut table, &mut icons, |_| unreachable!()).is_err());
    }

    #[test]
    fn stat_mismatch_drops_the_name_but_keeps_the_socket() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let mut a = attrs(5);
        a.name = Some(b"/tmp/sock".to_vec());
        a.vfs = Some((1, 2));
        decode_unix_diag(a, &mut table, &mut icons, |_| Ok((1, 999))).unwrap();
        let desc = table.lookup(5).unwrap().as_unix().unwrap();
        assert!(desc.name.is_none());
    }

    #[test]
    fn stat_match_keeps_the_name() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let mut a = attrs(6);
        a.name = Some(b"/tmp/sock".to_vec());
        a.vfs = Some((1, 2));
        decode_unix_diag(a, &mut table, &mut icons, |_| Ok((1, 2))).unwrap();
        let desc = table.lookup(6).unwrap().as_unix().unwrap();
        assert_eq!(desc.name.as_deref(), Some(&b"/tmp/sock"[..]));
    }

    #[test]
    fn icons_populate_the_secondary_index() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let mut a = attrs(7);
        a.icons = vec![100, 101];
        decode_unix_diag(a, &mut table, &mut icons, |_| unreachable!()).unwrap();
        assert_eq!(icons.lookup(100), Some(7));
        assert_eq!(icons.lookup(101), Some(7));
    }

    #[test]
    fn non_utf8_absolute_path_is_retained_via_raw_bytes() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let mut a = attrs(8);
        a.name = Some(vec![b'/', 0xFF, b'x']);
        a.vfs = Some((1, 2));
        decode_unix_diag(a, &mut table, &mut icons, |_| Ok((1, 2))).unwrap();
        let desc = table.lookup(8).unwrap().as_unix().unwrap();
        assert_eq!(desc.name.as_deref(), Some(&[b'/', 0xFF, b'x'][..]));
    }

    fn push_rtattr(buf: &mut Vec<u8>, rta_type: u16, payload: &[u8]) {
        let rta_len = 4 + payload.len();
        buf.extend_from_slice(&(rta_len as u16).to_ne_bytes());
        buf.extend_from_slice(&rta_type.to_ne_bytes());
        buf.extend_from_slice(payload);
        let aligned = (rta_len + 3) & !3;
        buf.resize(buf.len() + (aligned - rta_len), 0);
    }

    fn raw_message(ino: u32, sk_type: u8, state: u8, peer: Option<u32>, icons: &[u32]) -> Vec<u8> {
        let mut buf = vec![0u8; netlink::UNIX_DIAG_MSG_LEN];
        buf[1] = sk_type;
        buf[2] = state;
        buf[4..8].copy_from_slice(&ino.to_ne_bytes());

        if let Some(peer) = peer {
            push_rtattr(&mut buf, unix_diag_attr::PEER, &peer.to_ne_bytes());
        }
        if !icons.is_empty() {
            let mut payload = Vec::new();
            for i in icons {
                payload.extend_from_slice(&i.to_ne_bytes());
            }
            push_rtattr(&mut buf, unix_diag_attr::ICONS, &payload);
        }
        buf
    }

    #[test]
    fn message_decoder_registers_socket_from_raw_rtattrs() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let msg = raw_message(42, libc::SOCK_STREAM as u8, tcp_state::LISTEN, None, &[]);

        decode_unix_diag_message(&msg, &mut table, &mut icons, |_| unreachable!()).unwrap();

        let desc = table.lookup(42).unwrap().as_unix().unwrap();
        assert_eq!(desc.sk_type, SockType::Stream);
        assert_eq!(desc.state, SockState::Listen);
    }

    #[test]
    fn message_decoder_wires_peer_and_icons() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        let msg = raw_message(11, libc::SOCK_STREAM as u8, tcp_state::ESTABLISHED, Some(10), &[]);
        decode_unix_diag_message(&msg, &mut table, &mut icons, |_| unreachable!()).unwrap();
        assert_eq!(table.lookup(11).unwrap().as_unix().unwrap().peer_ino, 10);

        let listener_msg = raw_message(10, libc::SOCK_STREAM as u8, tcp_state::LISTEN, None, &[11]);
        decode_unix_diag_message(&listener_msg, &mut table, &mut icons, |_| unreachable!()).unwrap();
        assert_eq!(icons.lookup(11), Some(10));
    }

    #[test]
    fn message_decoder_rejects_truncated_header() {
        let mut table = SocketTable::new();
        let mut icons = IconIndex::new();
        assert!(decode_unix_diag_message(&[0u8; 4], &mut table, &mut icons, |_| unreachable!()).is_err());
    }
}
