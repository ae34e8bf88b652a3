pub mod client;

pub use client::KrxClient;
