//! Fehlertypen fuer das Audio-Subsystem

use thiserror::Error;

/// Alle moeglichen Fehler des Audio-Subsystems
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Audio-Subsystem-Fehler: {0}")]
    Subsystem(String),

    #[error("Freigabe fehlgeschlagen: {0}")]
    Freigabe(String),

    #[error("Audio-Subsystem wird heruntergefahren")]
    Heruntergefahren,
}

pub type AudioResult<T> = Result<T, AudioError>;
