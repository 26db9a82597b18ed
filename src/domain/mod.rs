//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs`: Domain types (validated, UI-ready)
//! - `wire.rs`: Raw serde structs matching exchange payloads
//! - `convert.rs`: `TryFrom`/`From` conversions with validation
//! - `state.rs`: State containers with update methods
//! - `client.rs`: Sub-client with one-shot REST methods

pub mod candle;
pub mod ticker;
