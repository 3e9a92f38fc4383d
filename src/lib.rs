//! Tile Game Client Library
//!
//! Client-side core of a multiplayer tile game: a binary frame codec, a
//! session manager over a pluggable transport, keyboard routing between
//! movement and chat, fixed-rate simulation pacing and the tile-map world
//! model the renderer draws from.
//!
//! Hosts drive everything through [`client::ClientCore`]; the bundled binary
//! is a headless host over WebSockets.

pub mod client;
pub mod config;
pub mod game;
pub mod net;
pub mod ui;
