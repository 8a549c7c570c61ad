//! Fehlertypen fuer das Steuerprotokoll

use thiserror::Error;

/// Fehler beim Lesen oder Schreiben einer Protokollnachricht
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    #[error("Ungueltige Nachricht: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protokollversion stimmt nicht ueberein: Client={erhalten}, Server={erwartet}")]
    Version { erwartet: i32, erhalten: i32 },

    #[error("Kodierungsfehler: {0}")]
    Kodierung(String),
}

pub type ProtokollResult<T> = Result<T, ProtokollFehler>;
