//! Opener dispatcher (§4.6): invoked by the file-descriptor registry when a
//! process needs its restored socket. Dispatches on the role assigned by
//! [`crate::restore::resolver::resolve_unix_peers`] to one of three
//! strategies: pair-master, pair-slave, or standalone.

use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use nix::sys::socket::{listen, socket, AddressFamily, Backlog, SockFlag, SockType as NixSockType};

use crate::checkpoint::table::SockType;
use crate::error::{Error, Result};
use crate::fdreg::FdRegistry;
use crate::fown::FileOwner;
use crate::queue::SkQueueRestorer;
use crate::restore::loader::Role;
use crate::session::RestoreSession;

fn nix_sock_type(t: SockType) -> NixSockType {
    match t {
        SockType::Stream => NixSockType::Stream,
        SockType::Dgram => NixSockType::Datagram,
    }
}

/// Whether the socket at `index` should have a cross-process transport
/// channel pre-created for it before opening starts (§4.6): true only for
/// the pair-slave side, which is a pure receiver of the hand-off.
pub fn unixsk_should_open_transport(session: &RestoreSession, index: usize) -> bool {
    session.get(index).role == Role::PairSlave
}

/// Bind policy (§4.6): stream sockets not in listen state never bind — the
/// restored name, if any, would collide with a peer's reconstruction and is
/// resolved by the pair/connect machinery instead (documented limitation,
/// see the design's Open Question 1).
fn should_bind(session: &RestoreSession, index: usize) -> bool {
    let info = session.get(index);
    if info.entry.sk_type == SockType::Stream && info.entry.state != crate::checkpoint::table::SockState::Listen {
        return false;
    }
    info.has_name()
}

fn bind_to_name(fd: RawFd, session: &RestoreSession, index: usize) -> Result<()> {
    let addr = session.get(index).addr().map_err(|_| {
        Error::graph(format!("socket {:#x}: malformed restored name", session.get(index).id()))
    })?;
    let (sockaddr, len) = addr.as_raw_general();
    // Safety: `sockaddr`/`len` were produced by UnixSocketAddr itself.
    unsafe { libc_bind(fd, sockaddr as *const _ as *const libc::sockaddr, len) }
}

unsafe fn libc_bind(fd: RawFd, addr: *const libc::sockaddr, len: libc::socklen_t) -> Result<()> {
    if libc::bind(fd, addr, len) != 0 {
        return Err(Error::Transport(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Apply the restored owner/signal metadata and descriptor flags to a live
/// socket (§4.6/§4.7's "apply owner/flags" step), matching
/// `rst_file_params(sk, &ui->ue.fown, ui->ue.flags)` in the original: sets
/// the SIGIO/SIGURG owner via `F_SETOWN`, the delivered signal via
/// `F_SETSIG`, and the `O_*` descriptor flags via `F_SETFL`.
pub(crate) fn apply_owner(fd: RawFd, fown: &FileOwner, flags: u32) -> Result<()> {
    if fown.pid != 0 {
        // F_SETOWN takes a single signed argument (positive = pid, negative
        // = process group); `fown.pid` is that argument as collected, `pgrp`
        // is carried through for informational/log purposes only.
        if unsafe { libc::fcntl(fd, libc::F_SETOWN, fown.pid) } != 0 {
            return Err(Error::Transport(std::io::Error::last_os_error()));
        }
    }
    if fown.signum != 0 {
        if unsafe { libc::fcntl(fd, libc::F_SETSIG, fown.signum) } != 0 {
            return Err(Error::Transport(std::io::Error::last_os_error()));
        }
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags as libc::c_int) } != 0 {
        return Err(Error::Transport(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Open the restored socket at `index`, dispatching on its resolved role.
/// Returns the live descriptor the caller hands to its owning process.
pub fn open_unixsk(
    session: &mut RestoreSession,
    registry: &mut dyn FdRegistry,
    queues: &mut dyn SkQueueRestorer,
    index: usize,
) -> Result<OwnedFd> {
    match session.get(index).role {
        Role::PairMaster => open_pair_master(session, registry, queues, index),
        Role::PairSlave => open_pair_slave(session, registry, queues, index),
        Role::Standalone => open_standalone(session, index),
    }
}

fn open_pair_master(
    session: &mut RestoreSession,
    registry: &mut dyn FdRegistry,
    queues: &mut dyn SkQueueRestorer,
    index: usize,
) -> Result<OwnedFd> {
    let sk_type = session.get(index).entry.sk_type;
    let (local, remote) = nix::sys::socket::socketpair(
        AddressFamily::Unix,
        nix_sock_type(sk_type),
        None,
        SockFlag::empty(),
    )
    .map_err(Error::Nix)?;

    let peer_index = session.get(index).peer.ok_or_else(|| {
        Error::graph(format!("pair-master {:#x} has no resolved peer", session.get(index).id()))
    })?;

    let self_id = session.get(index).id();
    let peer_id = session.get(peer_index).id();

    // Peer's queue goes into our local half (sk[0]); our own queued payload
    // goes into the half we're about to hand off (sk[1]).
    queues.restore_sk_queue(local.as_raw_fd(), peer_id)?;
    queues.restore_sk_queue(remote.as_raw_fd(), self_id)?;

    if should_bind(session, index) {
        bind_to_name(local.as_raw_fd(), session, index)?;
    }
    let entry = &session.get(index).entry;
    apply_owner(local.as_raw_fd(), &entry.fown, entry.flags)?;

    tracing::debug!(id = self_id, peer = peer_id, "pair-master handing off fd to peer");
    registry.channel(peer_id).send_fd(remote.as_raw_fd())?;
    // `remote` closes here once the registry has read and dup'd it: the
    // transport only needs to carry the descriptor across the boundary,
    // not keep it alive past the hand-off.
    drop(remote);

    Ok(local)
}

fn open_pair_slave(
    session: &mut RestoreSession,
    registry: &mut dyn FdRegistry,
    _queues: &mut dyn SkQueueRestorer,
    index: usize,
) -> Result<OwnedFd> {
    // Both halves' queues were already restored by the pair-master before
    // the hand-off (§4.6); the slave only needs to bind and apply metadata.
    let self_id = session.get(index).id();
    let raw = registry.channel(self_id).recv_fd()?;
    // Safety: the channel hands over ownership of a freshly received,
    // otherwise-unreferenced descriptor.
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };

    if should_bind(session, index) {
        bind_to_name(fd.as_raw_fd(), session, index)?;
    }
    let entry = &session.get(index).entry;
    apply_owner(fd.as_raw_fd(), &entry.fown, entry.flags)?;

    tracing::debug!(id = self_id, "pair-slave received fd over transport");
    Ok(fd)
}

fn open_standalone(session: &mut RestoreSession, index: usize) -> Result<OwnedFd> {
    let sk_type = session.get(index).entry.sk_type;
    let fd = socket(AddressFamily::Unix, nix_sock_type(sk_type), SockFlag::empty(), None).map_err(Error::Nix)?;

    if should_bind(session, index) {
        bind_to_name(fd.as_raw_fd(), session, index)?;
    }

    let info = session.get(index);
    let id = info.id();
    if info.entry.state == crate::checkpoint::table::SockState::Listen {
        let backlog = Backlog::new(info.entry.backlog as i32).unwrap_or(Backlog::new(16).unwrap());
        listen(&fd, backlog).map_err(Error::Nix)?;
        let entry = &session.get(index).entry;
        apply_owner(fd.as_raw_fd(), &entry.fown, entry.flags)?;
        tracing::debug!(id, "standalone socket now listening");
    } else if info.peer.is_some() {
        session.schedule_connect(index);
        tracing::debug!(id, "standalone socket has a peer, connect deferred");
    }

    Ok(fd)
}
