// relay-server/src/actors/mod.rs

pub mod peer_actor;
pub mod sweeper_actor;
