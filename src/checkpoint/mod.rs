//! Checkpoint-side socket graph collection and dumping (§2, checkpoint
//! path): netlink collection feeds the [`table`] via [`unix_decoder`] and
//! [`inet`], and [`dump`] serializes each open descriptor into the image.

pub mod dump;
pub mod inet;
pub mod table;
pub mod unix_decoder;
