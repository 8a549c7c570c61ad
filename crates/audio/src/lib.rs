//! pcvolume-audio – Anbindung an das Audio-Subsystem
//!
//! - [`AudioController`] / [`AudioControllerFabrik`]: Schnittstelle zur
//!   Plattform-Audio-API (Geraete, Standardgeraet, Lautstaerke, Mute)
//! - [`AudioCache`]: haelt genau einen Controller mit Lebensdauer (TTL),
//!   inklusive Aufwaermen beim Start
//! - [`SimuliertesAudioSystem`]: In-Memory-Subsystem fuer Betrieb ohne
//!   Plattform-Backend und fuer Tests

pub mod cache;
pub mod controller;
pub mod error;
pub mod simuliert;

// Bequeme Re-Exporte der wichtigsten Typen
pub use cache::{AudioCache, CacheKonfig, ABLAUF_TOLERANZ, MINDEST_LEBENSDAUER};
pub use controller::{
    AudioController, AudioControllerFabrik, AudioHandle, GeraetInfo, GeraetRef, SitzungInfo,
    StandardGeraet,
};
pub use error::{AudioError, AudioResult};
pub use simuliert::{Operation, SimuliertesAudioSystem, SimuliertesGeraet};
