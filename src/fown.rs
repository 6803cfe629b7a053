/// Owner/signal ownership of a descriptor, carried verbatim through dump
/// and restore (the `fown` field of [`crate::image::UnixSkEntry`]).
///
/// Collected at dump time and written out bit-for-bit; on restore,
/// [`crate::restore::opener::apply_owner`] (`pub(crate)`, called from every
/// opener strategy and from [`crate::restore::connect::run_unix_connections`]
/// after a deferred `connect` succeeds) applies it to the live descriptor via
/// `fcntl(F_SETOWN)`/`fcntl(F_SETSIG)`, alongside the sibling `flags` field
/// via `fcntl(F_SETFL)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOwner {
    pub pid: i32,
    pub pgrp: i32,
    pub uid: u32,
    pub euid: u32,
    pub signum: i32,
}

impl FileOwner {
    pub fn to_bytes(self) -> [u8; 20] {
        let mut buf = [0u8; 20];
        buf[0..4].copy_from_slice(&self.pid.to_le_bytes());
        buf[4..8].copy_from_slice(&self.pgrp.to_le_bytes());
        buf[8..12].copy_from_slice(&self.uid.to_le_bytes());
        buf[12..16].copy_from_slice(&self.euid.to_le_bytes());
        buf[16..20].copy_from_slice(&self.signum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; 20]) -> Self {
        FileOwner {
            pid: i32::from_le_bytes(buf[0..4].try_into().unwrap()),
            pgrp: i32::from_le_bytes(buf[4..8].try_into().unwrap()),
            uid: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            euid: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            signum: i32::from_le_bytes(buf[16..20].try_into().unwrap()),
        }
    }
}

/// Per-descriptor open flags (`O_*`), the `(pid, fd)` identity used to break
/// ties when selecting pair-master/pair-slave, and the descriptor's raw
/// numeric fd as seen by its owning process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OwnerId {
    pub pid: i32,
    pub fd: i32,
}
