//! AudioCache – zeitlich begrenzter Cache fuer den Audio-Controller
//!
//! Die Erzeugung des Controllers ist langsam, deshalb wird genau ein Handle
//! gehalten und bei Bedarf wiederverwendet. Jeder Zugriff ueber
//! [`AudioCache::holen`] verlaengert die Lebensdauer auf `jetzt + TTL`.
//!
//! ## Ablauf
//! Jeder Zugriff plant eine eigene Ablaufpruefung zum dann gueltigen
//! Ablaufzeitpunkt. Mehrere Pruefungen koennen gleichzeitig ausstehen. Eine
//! Pruefung liest beim Aufwachen den aktuellen Ablaufzeitpunkt unter dem
//! Lock neu und gibt den Controller nur frei, wenn dieser (abzueglich
//! [`ABLAUF_TOLERANZ`]) erreicht ist. Veraltete Pruefungen nach einer
//! Verlaengerung laufen damit ins Leere.
//!
//! ## Locking
//! Ein `tokio::sync::Mutex` schuetzt Handle und Ablaufzeitpunkt. Er wird nur
//! fuer "nachschlagen oder erzeugen, Ablauf stempeln" sowie fuer die Freigabe
//! gehalten, nie fuer Geraete-Operationen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::controller::{AudioControllerFabrik, AudioHandle};
use crate::error::{AudioError, AudioResult};

/// Kleinste erlaubte Lebensdauer
pub const MINDEST_LEBENSDAUER: Duration = Duration::from_secs(60);

/// Ablaufpruefungen duerfen um diese Spanne zu frueh aufwachen
pub const ABLAUF_TOLERANZ: Duration = Duration::from_secs(1);

/// Konfiguration des Caches
#[derive(Debug, Clone)]
pub struct CacheKonfig {
    /// Lebensdauer eines unbenutzten Controllers, mindestens [`MINDEST_LEBENSDAUER`]
    pub lebensdauer: Duration,
}

impl Default for CacheKonfig {
    fn default() -> Self {
        Self {
            lebensdauer: MINDEST_LEBENSDAUER,
        }
    }
}

#[derive(Default)]
struct CacheEintrag {
    controller: Option<AudioHandle>,
    ablauf: Option<Instant>,
}

struct CacheInner {
    fabrik: Arc<dyn AudioControllerFabrik>,
    lebensdauer: Duration,
    eintrag: Mutex<CacheEintrag>,
    shutdown_rx: watch::Receiver<bool>,
    erzeugungen: AtomicU64,
}

/// Cache fuer den einen Audio-Controller-Handle
///
/// `Clone` liefert eine weitere Referenz auf denselben Cache.
#[derive(Clone)]
pub struct AudioCache {
    inner: Arc<CacheInner>,
}

impl AudioCache {
    /// Erstellt einen leeren Cache. Der Controller wird erst beim ersten
    /// Zugriff erzeugt.
    ///
    /// Gibt `AudioError::Konfiguration` zurueck wenn die Lebensdauer unter
    /// [`MINDEST_LEBENSDAUER`] liegt.
    pub fn neu(
        fabrik: Arc<dyn AudioControllerFabrik>,
        konfig: CacheKonfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> AudioResult<Self> {
        if konfig.lebensdauer < MINDEST_LEBENSDAUER {
            return Err(AudioError::Konfiguration(format!(
                "Cache-Lebensdauer darf nicht kleiner als {:?} sein (war: {:?})",
                MINDEST_LEBENSDAUER, konfig.lebensdauer
            )));
        }
        trace!(lebensdauer = ?konfig.lebensdauer, "Cache-Lebensdauer gesetzt");

        Ok(Self {
            inner: Arc::new(CacheInner {
                fabrik,
                lebensdauer: konfig.lebensdauer,
                eintrag: Mutex::new(CacheEintrag::default()),
                shutdown_rx,
                erzeugungen: AtomicU64::new(0),
            }),
        })
    }

    /// Gibt den Controller zurueck und erzeugt ihn falls noetig.
    ///
    /// Setzt den Ablauf auf `jetzt + Lebensdauer` und plant eine
    /// Ablaufpruefung. Nach dem Shutdown-Signal wird kein Controller mehr
    /// erzeugt, der Aufruf liefert [`AudioError::Heruntergefahren`].
    pub async fn holen(&self) -> AudioResult<AudioHandle> {
        let mut eintrag = self.inner.eintrag.lock().await;
        // Unter dem Lock pruefen: `herunterfahren` wartet auf denselben Lock
        if *self.inner.shutdown_rx.borrow() {
            return Err(AudioError::Heruntergefahren);
        }
        let jetzt = Instant::now();

        // Abgelaufen, aber die Pruefung ist noch nicht gelaufen
        if eintrag.ablauf.is_some_and(|ablauf| ablauf <= jetzt) {
            if let Some(alt) = eintrag.controller.take() {
                debug!("Abgelaufener Audio-Controller wird vor Neuerzeugung freigegeben");
                freigeben(alt).await;
            }
        }

        let controller = match &eintrag.controller {
            Some(controller) => Arc::clone(controller),
            None => {
                let controller = self.inner.fabrik.erzeugen().await?;
                let anzahl = self.inner.erzeugungen.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(erzeugungen = anzahl, "Audio-Controller erzeugt");
                eintrag.controller = Some(Arc::clone(&controller));
                controller
            }
        };

        let vorher = eintrag.ablauf;
        let ablauf = Instant::now() + self.inner.lebensdauer;
        eintrag.ablauf = Some(ablauf);
        drop(eintrag);

        trace!(?vorher, ?ablauf, "Cache-Ablauf aktualisiert");
        self.ablauf_planen(ablauf);
        Ok(controller)
    }

    /// Erzeugt den Controller im Hintergrund vor, damit der erste Client
    /// nicht auf die Erzeugung warten muss.
    pub fn aufwaermen(&self) -> JoinHandle<()> {
        let cache = self.clone();
        let mut shutdown_rx = self.inner.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                ergebnis = cache.holen() => match ergebnis {
                    Ok(_) => debug!("Audio-Controller vorgewaermt"),
                    Err(e) => warn!(fehler = %e, "Aufwaermen des Audio-Controllers fehlgeschlagen"),
                },
                _ = shutdown_abwarten(&mut shutdown_rx) => {
                    debug!("Aufwaermen wegen Shutdown abgebrochen");
                }
            }
        })
    }

    /// Gibt den Controller sofort frei, unabhaengig von der Lebensdauer.
    /// Wird beim Herunterfahren des Dienstes aufgerufen.
    pub async fn herunterfahren(&self) {
        let mut eintrag = self.inner.eintrag.lock().await;
        eintrag.ablauf = None;
        if let Some(controller) = eintrag.controller.take() {
            freigeben(controller).await;
            info!("Audio-Controller beim Herunterfahren freigegeben");
        }
    }

    /// Anzahl der bisher erzeugten Controller
    pub fn erzeugungen(&self) -> u64 {
        self.inner.erzeugungen.load(Ordering::SeqCst)
    }

    /// Gibt `true` zurueck wenn aktuell ein Controller gehalten wird
    pub async fn ist_belegt(&self) -> bool {
        self.inner.eintrag.lock().await.controller.is_some()
    }

    pub fn lebensdauer(&self) -> Duration {
        self.inner.lebensdauer
    }

    fn ablauf_planen(&self, ablauf: Instant) {
        let inner: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let mut shutdown_rx = self.inner.shutdown_rx.clone();

        tokio::spawn(async move {
            trace!("Warte auf Cache-Ablauf");
            tokio::select! {
                _ = tokio::time::sleep_until(ablauf) => {}
                _ = shutdown_abwarten(&mut shutdown_rx) => return,
            }
            if let Some(inner) = inner.upgrade() {
                inner.ablauf_pruefen().await;
            }
        });
    }
}

impl CacheInner {
    async fn ablauf_pruefen(&self) {
        trace!("Pruefe ob der Cache abgelaufen ist");
        let mut eintrag = self.eintrag.lock().await;
        let abgelaufen = eintrag
            .ablauf
            .is_some_and(|ablauf| ablauf <= Instant::now() + ABLAUF_TOLERANZ);
        if !abgelaufen {
            return;
        }

        eintrag.ablauf = None;
        if let Some(controller) = eintrag.controller.take() {
            freigeben(controller).await;
            debug!("Cache abgelaufen, Audio-Controller freigegeben");
        }
    }
}

/// Gibt einen bereits aus dem Cache entfernten Controller frei. Fehler werden
/// nur geloggt.
async fn freigeben(controller: AudioHandle) {
    if let Err(e) = controller.dispose().await {
        warn!(fehler = %e, "Freigabe des Audio-Controllers fehlgeschlagen");
    }
}

/// Wartet bis Shutdown angefordert wurde. Ist der Sender weg, kommt kein
/// Shutdown mehr und das Future bleibt haengen.
async fn shutdown_abwarten(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|angefordert| *angefordert).await.is_err() {
        std::future::pending::<()>().await;
    }
}
