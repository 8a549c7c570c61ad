//! Abgleich – wendet ein Client-Update auf das Audio-Subsystem an
//!
//! Ein eingehender [`Snapshot`] beschreibt den gewuenschten Zustand des
//! Standardgeraets. Der Abgleich vergleicht ihn mit dem realen Zustand und
//! fuehrt nur die Operationen aus, die tatsaechlich etwas aendern:
//!
//! 1. Weicht die gewuenschte Geraete-ID ab, wird das Geraet als Standard-
//!    und Kommunikationsgeraet gesetzt. Mute und Lautstaerke derselben
//!    Nachricht werden dann nicht angewendet.
//! 2. Sonst wird Mute gesetzt, falls abweichend.
//! 3. Danach die Lautstaerke, schrittweise ueber [`lautstaerke_schritt`].
//!
//! ## Lautstaerke-Schritte
//! Clients senden waehrend eines Drehreglers viele Zwischenwerte. Lauter
//! wird es deshalb nur in Schritten von [`LAUTSTAERKE_SCHRITT`], leiser
//! sofort. Ziele sind immer gerade ganze Zahlen.

use pcvolume_audio::{AudioController, AudioResult};
use pcvolume_protocol::Snapshot;

/// Maximale Erhoehung pro Update, bezogen auf die aufgerundete Ist-Lautstaerke
pub const LAUTSTAERKE_SCHRITT: f64 = 2.0;

/// Ergebnis eines Abgleichs
#[derive(Debug, Clone, PartialEq)]
pub enum Abgleich {
    /// Das Update enthielt kein Standardgeraet
    Unveraendert,
    /// Das Standardgeraet wurde gewechselt
    GeraetGewechselt(String),
    /// Mute und/oder Lautstaerke am bestehenden Standardgeraet
    Angepasst {
        stumm: Option<bool>,
        lautstaerke: Option<f64>,
    },
}

impl Abgleich {
    /// Gibt true zurueck wenn mindestens eine Operation ausgefuehrt wurde
    pub fn hat_aenderung(&self) -> bool {
        match self {
            Self::Unveraendert => false,
            Self::GeraetGewechselt(_) => true,
            Self::Angepasst { stumm, lautstaerke } => stumm.is_some() || lautstaerke.is_some(),
        }
    }
}

/// Berechnet die naechste Ziel-Lautstaerke.
///
/// `None` bedeutet: nichts setzen. Das ist der Fall wenn der Wunsch keine
/// endliche Zahl ist, dem Ist-Wert entspricht oder das berechnete Ziel
/// gleich dem Ist-Wert waere.
pub fn lautstaerke_schritt(ist: f64, gewuenscht: f64) -> Option<f64> {
    if !ist.is_finite() || !gewuenscht.is_finite() || gewuenscht == ist {
        return None;
    }

    let mut ziel = if gewuenscht < ist {
        gewuenscht.ceil()
    } else {
        ist.ceil() + LAUTSTAERKE_SCHRITT
    };

    // Ungerade Ziele eine Stufe nach unten ziehen (gilt auch negativ)
    if ziel % 2.0 != 0.0 {
        ziel -= 1.0;
    }

    // `<= 0.0` faengt auch -0.0 ab
    let ziel = if ziel <= 0.0 { 0.0 } else { ziel.min(100.0) };

    (ziel != ist).then_some(ziel)
}

/// Gleicht ein Client-Update mit dem realen Zustand ab und wendet die
/// noetigen Operationen an.
pub async fn abgleichen(
    controller: &dyn AudioController,
    update: &Snapshot,
) -> AudioResult<Abgleich> {
    let Some(gewuenscht) = update.default_device.as_ref() else {
        return Ok(Abgleich::Unveraendert);
    };

    let ist = controller.default_device().await?;

    if let Some(ziel_id) = gewuenscht.device_id.as_deref() {
        if ziel_id != ist.id {
            let ziel = controller.resolve_device(ziel_id).await?;
            controller.set_default(&ziel).await?;
            controller.set_default_communications(&ziel).await?;
            tracing::info!(von = %ist.id, nach = %ziel_id, "Standardgeraet gewechselt");
            return Ok(Abgleich::GeraetGewechselt(ziel_id.to_string()));
        }
    }

    let geraet = ist.referenz();

    let mut stumm = None;
    if let Some(soll) = gewuenscht.master_muted {
        if soll != ist.stumm {
            controller.set_mute(&geraet, soll).await?;
            stumm = Some(soll);
        }
    }

    let mut lautstaerke = None;
    if let Some(soll) = gewuenscht.master_volume {
        if let Some(ziel) = lautstaerke_schritt(ist.lautstaerke, soll) {
            controller.set_volume(&geraet, ziel).await?;
            lautstaerke = Some(ziel);
        }
    }

    Ok(Abgleich::Angepasst { stumm, lautstaerke })
}
