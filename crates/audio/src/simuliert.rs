//! Simuliertes Audio-Subsystem
//!
//! In-Memory-Implementierung von [`AudioController`] und
//! [`AudioControllerFabrik`]. Der Hardware-Zustand (Geraete, Standardgeraete,
//! Lautstaerke, Mute) liegt in einem geteilten Speicher und ueberlebt damit
//! das Freigeben und Neuerzeugen von Controllern, wie echte Hardware auch.
//!
//! Wird vom Server genutzt, solange kein Plattform-Backend eingesteckt ist,
//! und von den Tests, die zusaetzlich das Operationsprotokoll, die Anzahl
//! der Freigaben und injizierbare Freigabefehler verwenden.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::controller::{
    AudioController, AudioControllerFabrik, AudioHandle, GeraetInfo, GeraetRef, SitzungInfo,
    StandardGeraet,
};
use crate::error::{AudioError, AudioResult};

/// Ein simuliertes Wiedergabegeraet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimuliertesGeraet {
    pub id: String,
    pub name: String,
    /// Nur aktive Geraete werden aufgelistet und koennen Standard werden
    pub aktiv: bool,
    /// Lautstaerke 0..=100
    pub lautstaerke: f64,
    pub stumm: bool,
    pub sitzungen: Vec<SitzungInfo>,
}

impl Default for SimuliertesGeraet {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            aktiv: true,
            lautstaerke: 50.0,
            stumm: false,
            sitzungen: Vec::new(),
        }
    }
}

impl SimuliertesGeraet {
    /// Aktives Geraet mit Lautstaerke 50, nicht gemutet
    pub fn neu(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Schreibende Operation, die am simulierten Subsystem ausgefuehrt wurde
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    StandardGesetzt(String),
    KommunikationGesetzt(String),
    StummGesetzt(String, bool),
    LautstaerkeGesetzt(String, f64),
}

#[derive(Debug)]
struct Hardware {
    geraete: Vec<SimuliertesGeraet>,
    standard: String,
    kommunikation: String,
    operationen: Vec<Operation>,
}

impl Hardware {
    fn geraet(&self, id: &str) -> AudioResult<&SimuliertesGeraet> {
        self.geraete
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| AudioError::GeraetNichtGefunden(id.to_string()))
    }

    fn geraet_mut(&mut self, id: &str) -> AudioResult<&mut SimuliertesGeraet> {
        self.geraete
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| AudioError::GeraetNichtGefunden(id.to_string()))
    }

    fn aktives_geraet(&self, id: &str) -> AudioResult<&SimuliertesGeraet> {
        let geraet = self.geraet(id)?;
        if !geraet.aktiv {
            return Err(AudioError::Subsystem(format!("Geraet '{id}' ist nicht aktiv")));
        }
        Ok(geraet)
    }
}

/// Simuliertes Audio-Subsystem (Fabrik und geteilter Hardware-Zustand)
#[derive(Clone)]
pub struct SimuliertesAudioSystem {
    hardware: Arc<Mutex<Hardware>>,
    konstruktionszeit: Duration,
    freigabe_fehler: Arc<AtomicBool>,
    erzeugt: Arc<AtomicUsize>,
    freigegeben: Arc<AtomicUsize>,
}

impl SimuliertesAudioSystem {
    /// Erstellt das System. Das erste aktive Geraet wird Standard- und
    /// Kommunikationsgeraet.
    pub fn neu(geraete: Vec<SimuliertesGeraet>) -> AudioResult<Self> {
        let ungueltig = geraete.iter().find(|g| {
            !g.lautstaerke.is_finite() || g.sitzungen.iter().any(|s| !s.lautstaerke.is_finite())
        });
        if let Some(geraet) = ungueltig {
            return Err(AudioError::Konfiguration(format!(
                "Geraet '{}' hat eine ungueltige Lautstaerke",
                geraet.id
            )));
        }
        let standard = geraete
            .iter()
            .find(|g| g.aktiv)
            .map(|g| g.id.clone())
            .ok_or(AudioError::KeinStandardAusgabegeraet)?;
        Ok(Self::mit_standard(geraete, standard))
    }

    fn mit_standard(geraete: Vec<SimuliertesGeraet>, standard: String) -> Self {
        Self {
            hardware: Arc::new(Mutex::new(Hardware {
                geraete,
                kommunikation: standard.clone(),
                standard,
                operationen: Vec::new(),
            })),
            konstruktionszeit: Duration::ZERO,
            freigabe_fehler: Arc::new(AtomicBool::new(false)),
            erzeugt: Arc::new(AtomicUsize::new(0)),
            freigegeben: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Zwei aktive Geraete und ein deaktiviertes
    pub fn beispiel() -> Self {
        let geraete = vec![
            SimuliertesGeraet {
                lautstaerke: 40.0,
                sitzungen: vec![SitzungInfo {
                    id: "sitzung-systemklaenge".into(),
                    name: "Systemklaenge".into(),
                    lautstaerke: 100.0,
                    stumm: false,
                }],
                ..SimuliertesGeraet::neu("lautsprecher", "Lautsprecher (Realtek Audio)")
            },
            SimuliertesGeraet {
                lautstaerke: 20.0,
                ..SimuliertesGeraet::neu("kopfhoerer", "Kopfhoerer (USB Audio)")
            },
            SimuliertesGeraet {
                aktiv: false,
                ..SimuliertesGeraet::neu("hdmi", "HDMI-Ausgang")
            },
        ];
        Self::mit_standard(geraete, "lautsprecher".into())
    }

    /// Kuenstliche Dauer jeder Controller-Erzeugung
    pub fn mit_konstruktionszeit(mut self, dauer: Duration) -> Self {
        self.konstruktionszeit = dauer;
        self
    }

    /// Laesst alle folgenden `dispose`-Aufrufe fehlschlagen
    pub fn freigabe_fehler_setzen(&self, fehler: bool) {
        self.freigabe_fehler.store(fehler, Ordering::SeqCst);
    }

    /// Anzahl erzeugter Controller
    pub fn erzeugt(&self) -> usize {
        self.erzeugt.load(Ordering::SeqCst)
    }

    /// Anzahl freigegebener Controller (auch fehlgeschlagene Freigaben)
    pub fn freigegeben(&self) -> usize {
        self.freigegeben.load(Ordering::SeqCst)
    }

    /// Alle bisher ausgefuehrten schreibenden Operationen
    pub fn operationen(&self) -> Vec<Operation> {
        self.hardware.lock().operationen.clone()
    }

    pub fn geraet(&self, id: &str) -> Option<SimuliertesGeraet> {
        self.hardware.lock().geraet(id).ok().cloned()
    }

    pub fn standard_id(&self) -> String {
        self.hardware.lock().standard.clone()
    }

    pub fn kommunikations_id(&self) -> String {
        self.hardware.lock().kommunikation.clone()
    }

    /// Aendert die Lautstaerke am Dienst vorbei (z.B. Lautstaerketasten am PC).
    /// Wird nicht im Operationsprotokoll vermerkt.
    pub fn lautstaerke_extern_setzen(&self, id: &str, lautstaerke: f64) -> AudioResult<()> {
        let lautstaerke = begrenzte_lautstaerke(lautstaerke)?;
        self.hardware.lock().geraet_mut(id)?.lautstaerke = lautstaerke;
        Ok(())
    }
}

/// Begrenzt auf 0..=100. NaN und Unendlich werden abgelehnt, sie waeren im
/// Snapshot nicht darstellbar.
fn begrenzte_lautstaerke(lautstaerke: f64) -> AudioResult<f64> {
    if !lautstaerke.is_finite() {
        return Err(AudioError::Subsystem(format!(
            "Ungueltige Lautstaerke: {lautstaerke}"
        )));
    }
    Ok(lautstaerke.clamp(0.0, 100.0))
}

#[async_trait]
impl AudioControllerFabrik for SimuliertesAudioSystem {
    async fn erzeugen(&self) -> AudioResult<AudioHandle> {
        if !self.konstruktionszeit.is_zero() {
            tokio::time::sleep(self.konstruktionszeit).await;
        }
        let nummer = self.erzeugt.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(nummer, "Simulierter Audio-Controller erzeugt");
        Ok(Arc::new(SimulierterController {
            system: self.clone(),
            freigegeben: AtomicBool::new(false),
        }))
    }
}

/// Ein einzelner Controller-Handle auf das simulierte System
struct SimulierterController {
    system: SimuliertesAudioSystem,
    freigegeben: AtomicBool,
}

impl SimulierterController {
    fn hardware(&self) -> AudioResult<parking_lot::MutexGuard<'_, Hardware>> {
        if self.freigegeben.load(Ordering::SeqCst) {
            return Err(AudioError::Subsystem("Controller wurde bereits freigegeben".into()));
        }
        Ok(self.system.hardware.lock())
    }
}

#[async_trait]
impl AudioController for SimulierterController {
    async fn list_active_devices(&self) -> AudioResult<Vec<GeraetInfo>> {
        let hardware = self.hardware()?;
        Ok(hardware
            .geraete
            .iter()
            .filter(|g| g.aktiv)
            .map(|g| GeraetInfo {
                id: g.id.clone(),
                name: g.name.clone(),
            })
            .collect())
    }

    async fn default_device(&self) -> AudioResult<StandardGeraet> {
        let hardware = self.hardware()?;
        let geraet = hardware
            .geraet(&hardware.standard)
            .map_err(|_| AudioError::KeinStandardAusgabegeraet)?;
        Ok(StandardGeraet {
            id: geraet.id.clone(),
            name: geraet.name.clone(),
            lautstaerke: geraet.lautstaerke,
            stumm: geraet.stumm,
        })
    }

    async fn resolve_device(&self, id: &str) -> AudioResult<GeraetRef> {
        let hardware = self.hardware()?;
        hardware.geraet(id)?;
        Ok(GeraetRef::neu(id))
    }

    async fn set_default(&self, geraet: &GeraetRef) -> AudioResult<()> {
        let mut hardware = self.hardware()?;
        hardware.aktives_geraet(geraet.id())?;
        hardware.standard = geraet.id().to_string();
        hardware
            .operationen
            .push(Operation::StandardGesetzt(geraet.id().to_string()));
        trace!(geraet = geraet.id(), "Standardgeraet gesetzt");
        Ok(())
    }

    async fn set_default_communications(&self, geraet: &GeraetRef) -> AudioResult<()> {
        let mut hardware = self.hardware()?;
        hardware.aktives_geraet(geraet.id())?;
        hardware.kommunikation = geraet.id().to_string();
        hardware
            .operationen
            .push(Operation::KommunikationGesetzt(geraet.id().to_string()));
        trace!(geraet = geraet.id(), "Kommunikationsgeraet gesetzt");
        Ok(())
    }

    async fn set_mute(&self, geraet: &GeraetRef, stumm: bool) -> AudioResult<()> {
        let mut hardware = self.hardware()?;
        hardware.geraet_mut(geraet.id())?.stumm = stumm;
        hardware
            .operationen
            .push(Operation::StummGesetzt(geraet.id().to_string(), stumm));
        trace!(geraet = geraet.id(), stumm, "Mute gesetzt");
        Ok(())
    }

    async fn set_volume(&self, geraet: &GeraetRef, lautstaerke: f64) -> AudioResult<()> {
        let lautstaerke = begrenzte_lautstaerke(lautstaerke)?;
        let mut hardware = self.hardware()?;
        hardware.geraet_mut(geraet.id())?.lautstaerke = lautstaerke;
        hardware
            .operationen
            .push(Operation::LautstaerkeGesetzt(geraet.id().to_string(), lautstaerke));
        trace!(geraet = geraet.id(), lautstaerke, "Lautstaerke gesetzt");
        Ok(())
    }

    async fn sessions(&self, geraet: &GeraetRef) -> AudioResult<Vec<SitzungInfo>> {
        let hardware = self.hardware()?;
        Ok(hardware.geraet(geraet.id())?.sitzungen.clone())
    }

    async fn dispose(&self) -> AudioResult<()> {
        self.freigegeben.store(true, Ordering::SeqCst);
        self.system.freigegeben.fetch_add(1, Ordering::SeqCst);
        if self.system.freigabe_fehler.load(Ordering::SeqCst) {
            return Err(AudioError::Freigabe("simulierter Freigabefehler".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nur_aktive_geraete_werden_gelistet() {
        let system = SimuliertesAudioSystem::beispiel();
        let controller = system.erzeugen().await.unwrap();
        let ids: Vec<String> = controller
            .list_active_devices()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec!["lautsprecher".to_string(), "kopfhoerer".to_string()]);
    }

    #[tokio::test]
    async fn erstes_aktives_geraet_ist_standard() {
        let system = SimuliertesAudioSystem::neu(vec![
            SimuliertesGeraet {
                aktiv: false,
                ..SimuliertesGeraet::neu("aus", "Aus")
            },
            SimuliertesGeraet::neu("an", "An"),
        ])
        .unwrap();
        assert_eq!(system.standard_id(), "an");
        assert_eq!(system.kommunikations_id(), "an");
    }

    #[tokio::test]
    async fn nicht_endliche_lautstaerke_wird_abgelehnt() {
        let system = SimuliertesAudioSystem::beispiel();
        let controller = system.erzeugen().await.unwrap();
        let geraet = GeraetRef::neu("lautsprecher");

        for wert in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(system.lautstaerke_extern_setzen("lautsprecher", wert).is_err());
            assert!(controller.set_volume(&geraet, wert).await.is_err());
        }
        assert_eq!(system.geraet("lautsprecher").unwrap().lautstaerke, 40.0);
        assert!(system.operationen().is_empty());

        system.lautstaerke_extern_setzen("lautsprecher", 250.0).unwrap();
        assert_eq!(system.geraet("lautsprecher").unwrap().lautstaerke, 100.0);
    }

    #[test]
    fn nan_in_geraeteliste_wird_abgelehnt() {
        let ergebnis = SimuliertesAudioSystem::neu(vec![SimuliertesGeraet {
            lautstaerke: f64::NAN,
            ..SimuliertesGeraet::neu("an", "An")
        }]);
        assert!(matches!(ergebnis, Err(AudioError::Konfiguration(_))));
    }

    #[test]
    fn ohne_aktives_geraet_kein_system() {
        let ergebnis = SimuliertesAudioSystem::neu(vec![SimuliertesGeraet {
            aktiv: false,
            ..SimuliertesGeraet::neu("aus", "Aus")
        }]);
        assert!(matches!(ergebnis, Err(AudioError::KeinStandardAusgabegeraet)));
    }

    #[tokio::test]
    async fn zustand_ueberlebt_neuen_controller() {
        let system = SimuliertesAudioSystem::beispiel();
        let erster = system.erzeugen().await.unwrap();
        erster
            .set_volume(&GeraetRef::neu("lautsprecher"), 64.0)
            .await
            .unwrap();
        erster.dispose().await.unwrap();

        let zweiter = system.erzeugen().await.unwrap();
        let standard = zweiter.default_device().await.unwrap();
        assert_eq!(standard.lautstaerke, 64.0);
        assert_eq!(system.erzeugt(), 2);
        assert_eq!(system.freigegeben(), 1);
    }

    #[tokio::test]
    async fn freigegebener_controller_ist_unbrauchbar() {
        let system = SimuliertesAudioSystem::beispiel();
        let controller = system.erzeugen().await.unwrap();
        controller.dispose().await.unwrap();
        assert!(matches!(
            controller.default_device().await,
            Err(AudioError::Subsystem(_))
        ));
    }

    #[tokio::test]
    async fn inaktives_geraet_kann_nicht_standard_werden() {
        let system = SimuliertesAudioSystem::beispiel();
        let controller = system.erzeugen().await.unwrap();
        let hdmi = controller.resolve_device("hdmi").await.unwrap();
        assert!(controller.set_default(&hdmi).await.is_err());
        assert_eq!(system.standard_id(), "lautsprecher");
    }

    #[tokio::test]
    async fn unbekanntes_geraet_nicht_aufloesbar() {
        let system = SimuliertesAudioSystem::beispiel();
        let controller = system.erzeugen().await.unwrap();
        assert!(matches!(
            controller.resolve_device("gibt-es-nicht").await,
            Err(AudioError::GeraetNichtGefunden(_))
        ));
    }

    #[tokio::test]
    async fn operationen_werden_protokolliert() {
        let system = SimuliertesAudioSystem::beispiel();
        let controller = system.erzeugen().await.unwrap();
        let kopfhoerer = controller.resolve_device("kopfhoerer").await.unwrap();
        controller.set_default(&kopfhoerer).await.unwrap();
        controller.set_mute(&kopfhoerer, true).await.unwrap();
        controller.set_volume(&kopfhoerer, 150.0).await.unwrap();

        assert_eq!(
            system.operationen(),
            vec![
                Operation::StandardGesetzt("kopfhoerer".into()),
                Operation::StummGesetzt("kopfhoerer".into(), true),
                Operation::LautstaerkeGesetzt("kopfhoerer".into(), 100.0),
            ]
        );
        assert_eq!(system.standard_id(), "kopfhoerer");
    }

    #[tokio::test]
    async fn freigabefehler_ist_injizierbar() {
        let system = SimuliertesAudioSystem::beispiel();
        system.freigabe_fehler_setzen(true);
        let controller = system.erzeugen().await.unwrap();
        assert!(matches!(controller.dispose().await, Err(AudioError::Freigabe(_))));
    }
}
