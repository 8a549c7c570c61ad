//! pcvolume-protocol – Wire-Format des Steuerprotokolls
//!
//! Zeilenbasiertes JSON ueber TCP, symmetrisch in beide Richtungen:
//! jede Zeile ist genau ein [`Snapshot`].

pub mod codec;
pub mod error;
pub mod snapshot;

pub use codec::{dekodieren, kodieren, version_pruefen};
pub use error::{ProtokollFehler, ProtokollResult};
pub use snapshot::{AudioSession, DeviceState, Snapshot, ANWENDUNGS_VERSION, PROTOKOLL_VERSION};
