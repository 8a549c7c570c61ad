//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context};
use pcvolume_audio::{CacheKonfig, SimuliertesGeraet, MINDEST_LEBENSDAUER};
use pcvolume_control::{ServerKonfig, STANDARD_PORT};
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Lebensdauer des Audio-Controllers
    pub cache: CacheEinstellungen,
    /// Audio-Backend
    pub audio: AudioEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// IP-Adresse des Listeners
    pub bind_adresse: String,
    pub port: u16,
    /// Obergrenze gleichzeitiger Verbindungen (fehlt = unbegrenzt)
    pub max_verbindungen: Option<usize>,
    /// Maximale Laenge einer eingehenden Zeile
    pub zeilenlimit_bytes: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: STANDARD_PORT,
            max_verbindungen: None,
            zeilenlimit_bytes: 64 * 1024,
        }
    }
}

/// Cache-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheEinstellungen {
    /// Lebensdauer eines unbenutzten Controllers in Sekunden (mindestens 60)
    pub lebensdauer_sek: u64,
}

impl Default for CacheEinstellungen {
    fn default() -> Self {
        Self {
            lebensdauer_sek: MINDEST_LEBENSDAUER.as_secs(),
        }
    }
}

/// Audio-Backend-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Backend: aktuell nur "simuliert"
    pub backend: String,
    /// Kuenstliche Dauer einer Controller-Erzeugung in Millisekunden
    pub konstruktion_ms: u64,
    /// Simulierte Geraete (leer = Beispielgeraete)
    pub geraete: Vec<SimuliertesGeraet>,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            backend: "simuliert".into(),
            konstruktion_ms: 0,
            geraete: Vec::new(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Filter-Direktive, z.B. "info" oder "info,pcvolume_audio=debug"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok(config)
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        self.bind_adresse()?;
        if self.netzwerk.zeilenlimit_bytes == 0 {
            bail!("netzwerk.zeilenlimit_bytes muss groesser als 0 sein");
        }
        if self.netzwerk.max_verbindungen == Some(0) {
            bail!("netzwerk.max_verbindungen muss groesser als 0 sein");
        }
        if self.cache.lebensdauer() < MINDEST_LEBENSDAUER {
            bail!(
                "cache.lebensdauer_sek muss mindestens {} sein (war: {})",
                MINDEST_LEBENSDAUER.as_secs(),
                self.cache.lebensdauer_sek
            );
        }
        if self.audio.backend != "simuliert" {
            bail!("Unbekanntes Audio-Backend '{}'", self.audio.backend);
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .netzwerk
            .bind_adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.netzwerk.bind_adresse))?;
        Ok(SocketAddr::new(ip, self.netzwerk.port))
    }

    /// Konfiguration fuer den TCP-Steuerserver
    pub fn server_konfig(&self) -> anyhow::Result<ServerKonfig> {
        Ok(ServerKonfig {
            bind_addr: self.bind_adresse()?,
            max_verbindungen: self.netzwerk.max_verbindungen,
            zeilenlimit_bytes: self.netzwerk.zeilenlimit_bytes,
        })
    }

    pub fn cache_konfig(&self) -> CacheKonfig {
        CacheKonfig {
            lebensdauer: self.cache.lebensdauer(),
        }
    }
}

impl CacheEinstellungen {
    pub fn lebensdauer(&self) -> Duration {
        Duration::from_secs(self.lebensdauer_sek)
    }
}
