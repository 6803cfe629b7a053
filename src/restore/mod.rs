//! Restore-side socket graph reconstruction (§2, restore path): [`loader`]
//! reads the image, [`resolver`] links peers and assigns pair roles,
//! [`opener`] dispatches each socket's construction strategy, and
//! [`connect`] drains the deferred connection queue.

pub mod connect;
pub mod loader;
pub mod opener;
pub mod resolver;
