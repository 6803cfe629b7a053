//! The UNIX socket image record (§6): a fixed-width header followed by
//! `namelen` raw name bytes. Records are simply appended one after another;
//! opening the image file, framing multiple record *types* in one stream,
//! and locating the stream at all are the image file layer's job and stay
//! external to this crate (§1) — we only define the byte layout of a single
//! record and how to read/write it on anything that implements
//! [`std::io::Read`] / [`std::io::Write`].

use std::io::{self, Read, Write};

use crate::checkpoint::table::{SockState, SockType};
use crate::fown::FileOwner;

/// Bit in `uflags` marking a peer as living outside the checkpointed
/// process tree (§6).
pub const UFLAG_EXTERN: u32 = 1;

fn sk_type_code(t: SockType) -> u32 {
    match t {
        SockType::Stream => 1,
        SockType::Dgram => 2,
    }
}

fn sk_type_from_code(code: u32) -> io::Result<SockType> {
    match code {
        1 => Ok(SockType::Stream),
        2 => Ok(SockType::Dgram),
        other => Err(io::Error::new(io::ErrorKind::InvalidData, format!("bad sk type code {other}"))),
    }
}

fn sk_state_code(s: SockState) -> u32 {
    match s {
        SockState::Listen => 1,
        SockState::Established => 2,
        SockState::Close => 3,
    }
}

fn sk_state_from_code(code: u32) -> io::Result<SockState> {
    match code {
        1 => Ok(SockState::Listen),
        2 => Ok(SockState::Established),
        3 => Ok(SockState::Close),
        other => Err(io::Error::new(io::ErrorKind::InvalidData, format!("bad sk state code {other}"))),
    }
}

/// The on-disk record for one UNIX socket, matching §6's field table
/// exactly (`id`, `type`, `state`, `namelen`, `flags`, `backlog`, `peer`,
/// `fown`, `uflags`), immediately followed on the wire by `namelen` raw
/// name bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixSkEntry {
    pub id: u32,
    pub sk_type: SockType,
    pub state: SockState,
    pub name: Vec<u8>,
    pub flags: u32,
    pub backlog: u32,
    pub peer: u32,
    pub fown: FileOwner,
    pub uflags: u32,
}

impl UnixSkEntry {
    pub fn is_extern(&self) -> bool {
        self.uflags & UFLAG_EXTERN != 0
    }

    /// Write this record (header + name bytes) to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.id.to_le_bytes())?;
        w.write_all(&sk_type_code(self.sk_type).to_le_bytes())?;
        w.write_all(&sk_state_code(self.state).to_le_bytes())?;
        w.write_all(&(self.name.len() as u32).to_le_bytes())?;
        w.write_all(&self.flags.to_le_bytes())?;
        w.write_all(&self.backlog.to_le_bytes())?;
        w.write_all(&self.peer.to_le_bytes())?;
        w.write_all(&self.fown.to_bytes())?;
        w.write_all(&self.uflags.to_le_bytes())?;
        w.write_all(&self.name)?;
        Ok(())
    }

    /// Read one record (header + name bytes) from `r`.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream before any bytes of a
    /// new record are read (the streaming-until-EOF contract of §6);
    /// a partial record is an `UnexpectedEof` error.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Option<Self>> {
        let mut id_buf = [0u8; 4];
        match r.read(&mut id_buf)? {
            0 => return Ok(None),
            4 => {}
            n => {
                r.read_exact(&mut id_buf[n..])?;
            }
        }
        let id = u32::from_le_bytes(id_buf);

        let mut u32_buf = [0u8; 4];
        let mut read_u32 = |r: &mut R| -> io::Result<u32> {
            r.read_exact(&mut u32_buf)?;
            Ok(u32::from_le_bytes(u32_buf))
        };
        let sk_type = sk_type_from_code(read_u32(r)?)?;
        let state = sk_state_from_code(read_u32(r)?)?;
        let namelen = read_u32(r)?;
        let flags = read_u32(r)?;
        let backlog = read_u32(r)?;
        let peer = read_u32(r)?;

        let mut fown_buf = [0u8; 20];
        r.read_exact(&mut fown_buf)?;
        let fown = FileOwner::from_bytes(&fown_buf);

        let uflags = read_u32(r)?;

        let mut name = vec![0u8; namelen as usize];
        r.read_exact(&mut name)?;

        Ok(Some(UnixSkEntry {
            id,
            sk_type,
            state,
            name,
            flags,
            backlog,
            peer,
            fown,
            uflags,
        }))
    }
}

impl std::fmt::Display for UnixSkEntry {
    /// One-line summary, supplementing the source's `show_unixsk` image
    /// inspection — not a wire format, just for logs and a `show`-style CLI
    /// built on top of this crate.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "id {:#x} type {} state {} namelen {} backlog {} peer {:#x} flags {:#x} uflags {:#x}",
            self.id,
            self.sk_type,
            self.state,
            self.name.len(),
            self.backlog,
            self.peer,
            self.flags,
            self.uflags,
        )
    }
}

/// Per-fd info record (§6): emitted once per open descriptor, independent
/// of whether the canonical `UnixSkEntry` has already been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdInfoEntry {
    pub fd: i32,
    pub id: u32,
    pub flags: u32,
}

pub const FDINFO_TYPE_UNIXSK: u32 = 1;

impl FdInfoEntry {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.fd.to_le_bytes())?;
        w.write_all(&FDINFO_TYPE_UNIXSK.to_le_bytes())?;
        w.write_all(&self.id.to_le_bytes())?;
        w.write_all(&self.flags.to_le_bytes())?;
        Ok(())
    }
}
