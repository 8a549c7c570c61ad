//! Fehlertypen fuer den Steuerdienst

use pcvolume_audio::AudioError;
use pcvolume_protocol::ProtokollFehler;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use crate::session::SessionZustand;

/// Fehlertyp fuer den Steuerdienst
#[derive(Debug, Error)]
pub enum ControlError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Der Listener konnte keine Verbindung mehr annehmen
    #[error("Accept fehlgeschlagen: {0}")]
    Accept(#[source] std::io::Error),

    /// Ungueltige Nachricht oder falsche Protokollversion
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtokollFehler),

    /// Zeile zu lang oder Lesefehler beim Framing
    #[error("Zeilenfehler: {0}")]
    Zeile(#[from] LinesCodecError),

    /// Fehler des Audio-Subsystems
    #[error("Audiofehler: {0}")]
    Audio(#[from] AudioError),

    /// Ungueltiger Zustandswechsel der Sitzung
    #[error("Ungueltiger Zustandswechsel: {von:?} -> {nach:?}")]
    Zustandswechsel {
        von: SessionZustand,
        nach: SessionZustand,
    },
}

impl ControlError {
    /// Gibt true zurueck wenn der Client eine fremde Protokollversion spricht
    pub fn ist_versionsfehler(&self) -> bool {
        matches!(self, Self::Protokoll(ProtokollFehler::Version { .. }))
    }
}

/// Result-Typ fuer den Steuerdienst
pub type ControlResult<T> = Result<T, ControlError>;
