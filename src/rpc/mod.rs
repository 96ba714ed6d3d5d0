pub mod client;
pub mod convert;
pub mod server;

pub use client::PeerClient;
pub use server::ChordService;
