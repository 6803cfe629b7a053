//! Socket checkpoint/restore engine.
//!
//! Enumerates UNIX and listening INET sockets open in a process tree,
//! reconstructs the peer graph (socketpairs, listeners with pending
//! in-flight connections, connected client/server pairs), and
//! serializes/restores that state across a checkpoint/restore boundary.
//!
//! The netlink transport, the image file layer, the socket payload queue
//! dump/restore subsystem, and the cross-process file-descriptor registry
//! are external collaborators: this crate defines narrow traits for them
//! ([`queue`], [`fdreg`]) and consumes whatever implementation the embedding
//! system provides.

pub mod addr;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fdreg;
pub mod fown;
pub mod image;
pub mod netlink;
pub mod queue;
pub mod restore;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
