//! The generic file-descriptor registry — mapping checkpoint ids to
//! restore-time processes and forwarding descriptors between them — is an
//! external collaborator (§1). This module defines the narrow interface
//! the opener and connection runner need from it: each checkpoint id's
//! `(pid, fd)` "master" identity (used to break pair-master/pair-slave
//! ties, §4.5) and a descriptor channel for handing a socketpair half
//! across a process boundary (the design's "descriptor passing as message
//! channel" note).

use std::os::unix::io::RawFd;

use crate::error::Result;
use crate::fown::OwnerId;

/// A one-shot channel that carries a single file descriptor, backed by
/// whatever cross-process transport the embedding registry uses.
pub trait FdChannel {
    fn send_fd(&mut self, fd: RawFd) -> Result<()>;
    fn recv_fd(&mut self) -> Result<RawFd>;
}

/// Looks up ownership identity and opens descriptor channels by checkpoint
/// id. Implementations live in the embedding checkpoint/restore system;
/// this crate only consumes the trait.
pub trait FdRegistry {
    /// The `(pid, fd)` of the descriptor-list entry considered this
    /// checkpoint id's "master" instance — the value the total order in
    /// §4.5 is computed over.
    fn owner(&self, id: u32) -> OwnerId;

    /// Borrow the descriptor channel associated with checkpoint id `id`.
    fn channel(&mut self, id: u32) -> &mut dyn FdChannel;
}

/// An in-process `FdRegistry` good enough to exercise pair-master /
/// pair-slave hand-off end to end in this crate's own tests, using a
/// real dgram transport and `SCM_RIGHTS` ancillary data exactly as
/// §4.6 describes, just without a second OS process on the other end.
///
/// Not feature-gated: it's plain safe code over the same `nix` primitives
/// the rest of the crate already depends on unconditionally, and both this
/// crate's unit tests and its `tests/` integration tests need to reach it.
pub mod testing {

    use std::collections::HashMap;
    use std::io::{IoSlice, IoSliceMut};
    use std::os::fd::OwnedFd;
    use std::os::unix::io::{AsRawFd, RawFd};

    use nix::sys::socket::{
        recvmsg, sendmsg, socketpair, AddressFamily, ControlMessage, ControlMessageOwned,
        MsgFlags, SockFlag, SockType as NixSockType,
    };

    use super::{FdChannel, FdRegistry};
    use crate::error::{Error, Result};
    use crate::fown::OwnerId;

    /// A loopback `SOCK_DGRAM` pair standing in for the cross-process
    /// transport; `send_fd`/`recv_fd` pass a descriptor over it via
    /// `SCM_RIGHTS`, just like `send_fd_to_peer`/`recv_fd` in §4.6.
    pub struct LoopbackChannel {
        tx: OwnedFd,
        rx: OwnedFd,
    }

    impl LoopbackChannel {
        pub fn new() -> Result<Self> {
            let (a, b) = socketpair(
                AddressFamily::Unix,
                NixSockType::Datagram,
                None,
                SockFlag::empty(),
            )
            .map_err(Error::Nix)?;
            Ok(LoopbackChannel { tx: a, rx: b })
        }
    }

    impl FdChannel for LoopbackChannel {
        fn send_fd(&mut self, fd: RawFd) -> Result<()> {
            let iov = [IoSlice::new(b"f")];
            let fds = [fd];
            let cmsg = [ControlMessage::ScmRights(&fds)];
            sendmsg::<()>(self.tx.as_raw_fd(), &iov, &cmsg, MsgFlags::empty(), None)
                .map_err(Error::Nix)?;
            Ok(())
        }

        fn recv_fd(&mut self) -> Result<RawFd> {
            let mut buf = [0u8; 1];
            let mut iov = [IoSliceMut::new(&mut buf)];
            let mut cmsg_buf = nix::cmsg_space!([RawFd; 1]);
            let msg = recvmsg::<()>(self.rx.as_raw_fd(), &mut iov, Some(&mut cmsg_buf), MsgFlags::empty())
                .map_err(Error::Nix)?;
            for cmsg in msg.cmsgs() {
                if let ControlMessageOwned::ScmRights(fds) = cmsg {
                    if let Some(fd) = fds.first() {
                        return Ok(*fd);
                    }
                }
            }
            Err(Error::graph("no descriptor received on transport channel"))
        }
    }

    /// Maps checkpoint ids to a synthetic `(pid, fd)` owner identity and a
    /// lazily created [`LoopbackChannel`] per id.
    #[derive(Default)]
    pub struct LoopbackRegistry {
        owners: HashMap<u32, OwnerId>,
        channels: HashMap<u32, LoopbackChannel>,
    }

    impl LoopbackRegistry {
        pub fn new() -> Self {
            LoopbackRegistry::default()
        }

        pub fn set_owner(&mut self, id: u32, owner: OwnerId) {
            self.owners.insert(id, owner);
        }
    }

    impl FdRegistry for LoopbackRegistry {
        fn owner(&self, id: u32) -> OwnerId {
            self.owners.get(&id).copied().unwrap_or(OwnerId { pid: 0, fd: id as i32 })
        }

        fn channel(&mut self, id: u32) -> &mut dyn FdChannel {
            self.channels
                .entry(id)
                .or_insert_with(|| LoopbackChannel::new().expect("loopback transport"))
        }
    }
}
