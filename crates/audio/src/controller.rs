//! Schnittstelle zum Audio-Subsystem des Betriebssystems
//!
//! Die eigentliche Plattform-API (Geraete-Enumeration, Lautstaerke, Mute,
//! Standardgeraet) liegt ausserhalb dieses Crates. Sie wird ueber zwei
//! Traits angebunden:
//! - [`AudioControllerFabrik`] erzeugt den teuren Controller-Handle
//! - [`AudioController`] ist der Handle selbst, ueber den alle Geraete-
//!   Operationen laufen
//!
//! Alle Operationen sind async, weil sie in der Plattform-API blockieren
//! oder lange dauern koennen.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AudioResult;

/// Geteilter Controller-Handle, wie ihn der [`crate::AudioCache`] ausgibt
pub type AudioHandle = Arc<dyn AudioController>;

/// Aktives Wiedergabegeraet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeraetInfo {
    /// Eindeutiger Bezeichner des Subsystems
    pub id: String,
    /// Anzeigename
    pub name: String,
}

/// Aktueller Zustand des Standard-Wiedergabegeraets
#[derive(Debug, Clone, PartialEq)]
pub struct StandardGeraet {
    pub id: String,
    pub name: String,
    /// Lautstaerke 0..=100
    pub lautstaerke: f64,
    pub stumm: bool,
}

impl StandardGeraet {
    /// Referenz auf dieses Geraet fuer schreibende Operationen
    pub fn referenz(&self) -> GeraetRef {
        GeraetRef::neu(self.id.clone())
    }
}

/// Aufgeloestes Geraet, Ziel fuer schreibende Operationen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeraetRef {
    id: String,
}

impl GeraetRef {
    pub fn neu(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Audio-Sitzung einer Anwendung auf einem Geraet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungInfo {
    pub id: String,
    pub name: String,
    pub lautstaerke: f64,
    pub stumm: bool,
}

/// Handle auf das Audio-Subsystem
#[async_trait]
pub trait AudioController: Send + Sync {
    /// Alle Wiedergabegeraete im Zustand "aktiv"
    async fn list_active_devices(&self) -> AudioResult<Vec<GeraetInfo>>;

    /// Das aktuelle Standard-Wiedergabegeraet inklusive Lautstaerke und Mute
    async fn default_device(&self) -> AudioResult<StandardGeraet>;

    /// Loest eine Geraete-ID auf
    async fn resolve_device(&self, id: &str) -> AudioResult<GeraetRef>;

    /// Setzt das Geraet als Standard-Wiedergabegeraet
    async fn set_default(&self, geraet: &GeraetRef) -> AudioResult<()>;

    /// Setzt das Geraet als Standard-Kommunikationsgeraet
    async fn set_default_communications(&self, geraet: &GeraetRef) -> AudioResult<()>;

    async fn set_mute(&self, geraet: &GeraetRef, stumm: bool) -> AudioResult<()>;

    /// Setzt die Lautstaerke (0..=100)
    async fn set_volume(&self, geraet: &GeraetRef, lautstaerke: f64) -> AudioResult<()>;

    /// Anwendungs-Sitzungen auf dem Geraet. Backends ohne Sitzungs-Unterstuetzung
    /// liefern eine leere Liste.
    async fn sessions(&self, _geraet: &GeraetRef) -> AudioResult<Vec<SitzungInfo>> {
        Ok(Vec::new())
    }

    /// Gibt die Ressourcen des Subsystems frei. Danach ist der Handle unbrauchbar.
    async fn dispose(&self) -> AudioResult<()>;
}

/// Erzeugt Controller-Handles. Die Erzeugung gilt als langsam.
#[async_trait]
pub trait AudioControllerFabrik: Send + Sync {
    async fn erzeugen(&self) -> AudioResult<AudioHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenz_uebernimmt_id() {
        let geraet = StandardGeraet {
            id: "geraet-1".into(),
            name: "Lautsprecher".into(),
            lautstaerke: 40.0,
            stumm: false,
        };
        assert_eq!(geraet.referenz().id(), "geraet-1");
        assert_eq!(geraet.referenz(), GeraetRef::neu("geraet-1"));
    }
}
