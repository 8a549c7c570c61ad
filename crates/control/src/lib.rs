//! pcvolume-control – TCP-Steuerdienst
//!
//! Nimmt Client-Verbindungen auf Port 3500 an, sendet pro Verbindung den
//! aktuellen Audio-Zustand und gleicht eingehende Updates mit dem
//! Audio-Subsystem ab.
//!
//! ## Module
//! - `server`     – Listener und Accept-Loop
//! - `connection` – Verarbeitung einer einzelnen Verbindung
//! - `session`    – Zustand einer Verbindung
//! - `abgleich`   – Anwenden eines Updates (Geraetewechsel, Mute, Lautstaerke)
//! - `zustand`    – Aufbau des ausgehenden Snapshots

pub mod abgleich;
pub mod connection;
pub mod error;
pub mod server;
pub mod session;
pub mod zustand;

pub use abgleich::{abgleichen, lautstaerke_schritt, Abgleich, LAUTSTAERKE_SCHRITT};
pub use connection::ClientConnection;
pub use error::{ControlError, ControlResult};
pub use server::{ServerKonfig, VolumeServer, STANDARD_PORT};
pub use session::{SessionZustand, TcpSession};
pub use zustand::zustand_lesen;
