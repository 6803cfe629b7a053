//! Restore-side socket state and the loader that populates it (§4.5, first
//! half): stream every [`UnixSkEntry`] out of the image, validate it,
//! unlink any stale filesystem path, and register it for later peer
//! resolution and opening.

use std::io::Read;

use crate::addr::UnixSocketAddr;
use crate::error::{Error, Result};
use crate::image::UnixSkEntry;

/// Role assigned to a [`UnixSkInfo`] by [`crate::restore::resolver::resolve_unix_peers`]
/// (§3, invariant 4: the two flags never coexist on the same socket).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Standalone,
    PairMaster,
    PairSlave,
}

/// The decoded restore-side view of one UNIX socket (§3, `UnixSkInfo`).
///
/// `peer` is an index into the owning [`crate::session::RestoreSession`]'s
/// socket arena rather than a pointer or `Rc`: the arena is append-only for
/// the whole restore phase, so an index borrowed at resolve time stays
/// valid through opening and connecting (design's "back-references without
/// cycles" note).
#[derive(Debug, Clone)]
pub struct UnixSkInfo {
    pub entry: UnixSkEntry,
    pub peer: Option<usize>,
    pub role: Role,
}

impl UnixSkInfo {
    pub fn id(&self) -> u32 {
        self.entry.id
    }

    pub fn addr(&self) -> Result<UnixSocketAddr> {
        UnixSocketAddr::from_wire_name(&self.entry.name).map_err(Error::Transport)
    }

    /// Whether this socket has a name at all (an unnamed/anonymous socket
    /// binds to nothing on restore).
    pub fn has_name(&self) -> bool {
        !self.entry.name.is_empty()
    }
}

/// Maximum length of a `sockaddr_un.sun_path`, matching the validation the
/// loader performs on `namelen` (§4.5).
pub const UNIX_PATH_MAX: usize = 108;

/// Read every `UnixSkEntry` out of `r`, validating `namelen` and unlinking
/// any stale filesystem entry that would otherwise block a later `bind`
/// (§4.5). Returns the loaded sockets in image order; the caller registers
/// them into a [`crate::session::RestoreSession`].
pub fn load_unix_sockets<R: Read>(r: &mut R) -> Result<Vec<UnixSkInfo>> {
    let mut out = Vec::new();
    while let Some(entry) = UnixSkEntry::read_from(r).map_err(Error::Transport)? {
        if entry.name.len() >= UNIX_PATH_MAX {
            return Err(Error::graph(format!(
                "unix socket {:#x}: bad name len {}",
                entry.id,
                entry.name.len()
            )));
        }

        if !entry.name.is_empty() && entry.name[0] != 0 && !entry.is_extern() {
            // Make the filesystem clean from sockets we're about to
            // restore; see bind_unix_sk for why.
            use std::os::unix::ffi::OsStrExt;
            let path = std::path::Path::new(std::ffi::OsStr::from_bytes(&entry.name));
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Transport(e)),
            }
        }

        tracing::debug!(id = entry.id, peer = entry.peer, "loaded unix socket");
        out.push(UnixSkInfo { entry, peer: None, role: Role::Standalone });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::table::{SockState, SockType};
    use crate::fown::FileOwner;

    fn entry(id: u32, name: &[u8], peer: u32) -> UnixSkEntry {
        UnixSkEntry {
            id,
            sk_type: SockType::Stream,
            state: SockState::Listen,
            name: name.to_vec(),
            flags: 0,
            backlog: 8,
            peer,
            fown: FileOwner::default(),
            uflags: 0,
        }
    }

    #[test]
    fn loads_every_record_in_order() {
        let mut buf = Vec::new();
        entry(1, b"", 0).write_to(&mut buf).unwrap();
        entry(2, b"\0abstract", 1).write_to(&mut buf).unwrap();

        let mut cursor = &buf[..];
        let loaded = load_unix_sockets(&mut cursor).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id(), 1);
        assert_eq!(loaded[1].id(), 2);
        assert_eq!(loaded[1].entry.peer, 1);
    }

    #[test]
    fn unlinks_stale_path_before_bind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        std::fs::write(&path, b"leftover").unwrap();

        let mut buf = Vec::new();
        entry(1, path.to_str().unwrap().as_bytes(), 0).write_to(&mut buf).unwrap();

        let mut cursor = &buf[..];
        let loaded = load_unix_sockets(&mut cursor).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn rejects_oversized_name() {
        let mut buf = Vec::new();
        entry(1, &vec![b'a'; UNIX_PATH_MAX], 0).write_to(&mut buf).unwrap();
        let mut cursor = &buf[..];
        assert!(load_unix_sockets(&mut cursor).is_err());
    }
}
