use serde::{Deserialize, Serialize};

/// Policy knobs consulted by the checkpoint and restore phases.
///
/// This crate has no command-line surface or file format of its own (see
/// the design's external interfaces section); an embedding driver loads a
/// `Config` however it likes and hands it to [`crate::session::CheckpointSession`]
/// or [`crate::session::RestoreSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// When `true`, permits dumping UNIX sockets whose peer lives outside
    /// the checkpointed process tree (dgram only), and permits resolving
    /// peers flagged `EXTERN` during restore. When `false`, encountering
    /// such a socket is fatal.
    pub ext_unix_sk: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config { ext_unix_sk: false }
    }
}
