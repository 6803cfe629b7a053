//! Per-fd UNIX checkpoint writer (§4.3) and external finalizer (§4.4).

use std::io::Write;
use std::os::unix::io::RawFd;

use crate::checkpoint::table::{SockState, SockType, SocketTable};
use crate::error::{Error, Result};
use crate::fown::FileOwner;
use crate::image::{FdInfoEntry, UnixSkEntry, FDINFO_TYPE_UNIXSK, UFLAG_EXTERN};
use crate::queue::SkQueueDumper;
use crate::session::CheckpointSession;

/// Dump one open UNIX socket descriptor: writes the always-unconditional
/// fdinfo record, and — guarded by the desc's `dumped` flag — the canonical
/// `UnixSkEntry` the first time any fd referencing this inode is seen.
///
/// `fd`, `ino`, `fown` and `flags` describe the open descriptor being
/// dumped; `fdinfo_out` is the per-process descriptor image, `unix_image`
/// the shared UNIX socket image both per §6.
pub fn dump_unixsk<W1: Write, W2: Write>(
    session: &mut CheckpointSession,
    fd: RawFd,
    ino: u32,
    fown: FileOwner,
    flags: u32,
    fdinfo_out: &mut W1,
    unix_image: &mut W2,
    queues: &mut dyn SkQueueDumper,
) -> Result<()> {
    FdInfoEntry { fd, id: ino, flags }
        .write_to(fdinfo_out)
        .map_err(Error::Transport)?;

    let already_dumped = {
        let desc = session
            .table
            .lookup(ino)
            .ok_or_else(|| Error::graph(format!("fd {fd}: inode {ino:#x} missing from socket table")))?;
        desc.dumped()
    };
    if already_dumped {
        return Ok(());
    }

    let (sk_type, state, name, peer_ino, rqlen, wqlen) = {
        let desc = session.table.lookup(ino).unwrap().as_unix().ok_or_else(|| {
            Error::unsupported(format!("inode {ino:#x} is not a unix socket"))
        })?;
        (desc.sk_type, desc.state, desc.name.clone(), desc.peer_ino, desc.rqlen, desc.wqlen)
    };

    match (sk_type, state) {
        (SockType::Stream, SockState::Listen)
        | (SockType::Stream, SockState::Established)
        | (SockType::Dgram, SockState::Listen)
        | (SockType::Dgram, SockState::Established)
        | (SockType::Dgram, SockState::Close) => {}
        other => {
            return Err(Error::unsupported(format!(
                "inode {ino:#x}: unsupported (type, state) {other:?}"
            )))
        }
    }

    let mut peer = peer_ino;
    if peer != 0 {
        let peer_reciprocal = session
            .table
            .lookup(peer)
            .and_then(|d| d.as_unix())
            .map(|p| p.peer_ino == ino);
        match peer_reciprocal {
            Some(true) => {}
            Some(false) => {
                let peer_desc = session.table.lookup(peer).and_then(|d| d.as_unix());
                let peer_named = peer_desc.map(|p| p.name.is_some()).unwrap_or(false);
                let peer_dumped = peer_desc.map(|p| p.dumped).unwrap_or(false);
                if peer_named {
                    // Peer exists but doesn't point back: it's named, so it
                    // can be connected to by path on restore. Defer it in
                    // case it never gets its own fd dumped directly; no need
                    // if it's already been dumped through its own fd.
                    if !peer_dumped {
                        session.defer_external(peer);
                    }
                } else {
                    return Err(Error::graph(format!(
                        "inode {ino:#x}: peer {peer:#x} is unreachable (unnamed, not reciprocal)"
                    )));
                }
            }
            None => {
                return Err(Error::graph(format!("inode {ino:#x}: unreachable peer {peer:#x}")));
            }
        }
    } else if state == SockState::Established {
        // In-flight accept-queue entry: resolve via the icon index keyed by
        // this socket's own inode.
        match session.icons.lookup(ino) {
            Some(listening_ino) => {
                let is_listening = session
                    .table
                    .lookup(listening_ino)
                    .and_then(|d| d.as_unix())
                    .map(|d| d.state == SockState::Listen)
                    .unwrap_or(false);
                if !is_listening {
                    return Err(Error::graph(format!(
                        "inode {ino:#x}: dangling in-flight connection to non-listening {listening_ino:#x}"
                    )));
                }
                peer = listening_ino;
            }
            None => {
                return Err(Error::graph(format!("inode {ino:#x}: dangling in-flight connection")));
            }
        }
    }

    let entry = UnixSkEntry {
        id: ino,
        sk_type,
        state,
        name: name.unwrap_or_default(),
        flags,
        backlog: wqlen,
        peer,
        fown,
        uflags: 0,
    };
    entry.write_to(unix_image).map_err(Error::Transport)?;

    if rqlen > 0 && !(sk_type == SockType::Stream && state == SockState::Listen) {
        queues.dump_sk_queue(fd, ino)?;
    }

    session.undefer(ino);
    if let Some(desc) = session.table.lookup_mut(ino) {
        desc.set_dumped(true);
    }

    tracing::debug!(ino, peer, "dumped unix socket");
    Ok(())
}

/// External finalizer (§4.4): after every per-fd dump, emit a stub entry
/// for each externally-owned UNIX peer still on the defer list.
pub fn finalize_external<W: Write>(session: &mut CheckpointSession, unix_image: &mut W) -> Result<()> {
    let pending = std::mem::take(&mut session.external_defer);
    for ino in pending {
        let already_dumped = session
            .table
            .lookup(ino)
            .map(|d| d.dumped())
            .unwrap_or(false);
        debug_assert!(!already_dumped, "external finalizer saw an already-dumped inode");

        if !session.config.ext_unix_sk {
            return Err(Error::policy(format!("runaway external socket {ino:#x}")));
        }

        let sk_type = session
            .table
            .lookup(ino)
            .and_then(|d| d.as_unix())
            .map(|d| d.sk_type);
        if sk_type != Some(SockType::Dgram) {
            return Err(Error::unsupported(format!(
                "external socket {ino:#x} is not a dgram socket"
            )));
        }

        let name = session
            .table
            .lookup(ino)
            .and_then(|d| d.as_unix())
            .and_then(|d| d.name.clone())
            .unwrap_or_default();

        let entry = UnixSkEntry {
            id: ino,
            sk_type: SockType::Dgram,
            state: SockState::Listen,
            name,
            flags: 0,
            backlog: 0,
            peer: 0,
            fown: FileOwner::default(),
            uflags: UFLAG_EXTERN,
        };
        entry.write_to(unix_image).map_err(Error::Transport)?;

        if let Some(desc) = session.table.lookup_mut(ino) {
            desc.set_dumped(true);
        }
        tracing::info!(ino, "emitted stub entry for external peer");
    }
    Ok(())
}
