//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, die Werte aus der Konfigurationsdatei
//! ueberschreiben:
//! - `PCVOL_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder
//!   `info,pcvolume_audio=trace`), Standard: info
//! - `PCVOL_LOG_FORMAT`: Format (text/json), Standard: text

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_LEVEL: &str = "PCVOL_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "PCVOL_LOG_FORMAT";

/// Fehler beim Einrichten des Loggings
#[derive(Debug, Error)]
pub enum LoggingFehler {
    #[error("Ungueltiges Log-Format '{0}' (erlaubt: text, json)")]
    UngueltigesFormat(String),

    #[error("Ungueltige Log-Filter-Direktive '{direktive}': {grund}")]
    UngueltigerFilter { direktive: String, grund: String },

    #[error("Logging wurde bereits initialisiert")]
    BereitsInitialisiert,
}

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anders => Err(LoggingFehler::UngueltigesFormat(anders.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Aufgeloeste Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEinstellungen {
    pub level: String,
    pub format: LogFormat,
}

impl LogEinstellungen {
    /// Kombiniert Konfigurationswerte mit optionalen Overrides aus der
    /// Umgebung. Gesetzte, nicht-leere Overrides gewinnen.
    pub fn aufloesen(
        level: &str,
        format: &str,
        env_level: Option<String>,
        env_format: Option<String>,
    ) -> Result<Self, LoggingFehler> {
        let level = env_level
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| level.to_string());
        let format = env_format
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| format.to_string());

        Ok(Self {
            level,
            format: format.parse()?,
        })
    }

    /// Wie [`Self::aufloesen`], liest die Overrides aus der Umgebung
    pub fn aus_umgebung(level: &str, format: &str) -> Result<Self, LoggingFehler> {
        Self::aufloesen(
            level,
            format,
            std::env::var(ENV_LOG_LEVEL).ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
        )
    }

    fn filter(&self) -> Result<EnvFilter, LoggingFehler> {
        EnvFilter::try_new(&self.level).map_err(|e| LoggingFehler::UngueltigerFilter {
            direktive: self.level.clone(),
            grund: e.to_string(),
        })
    }
}

/// Initialisiert das Logging-System.
///
/// `level` und `format` stammen aus der Konfiguration, `PCVOL_LOG_LEVEL` und
/// `PCVOL_LOG_FORMAT` ueberschreiben sie.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<LogEinstellungen, LoggingFehler> {
    let einstellungen = LogEinstellungen::aus_umgebung(level, format)?;
    let filter = einstellungen.filter()?;

    let ergebnis = match einstellungen.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    ergebnis.map_err(|_| LoggingFehler::BereitsInitialisiert)?;

    Ok(einstellungen)
}
