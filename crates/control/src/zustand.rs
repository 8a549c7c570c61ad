//! Liest den aktuellen Audio-Zustand als ausgehenden Snapshot

use std::collections::BTreeMap;

use pcvolume_audio::{AudioController, AudioResult};
use pcvolume_protocol::{AudioSession, DeviceState, Snapshot};

/// Baut einen vollstaendigen Snapshot aus dem realen Zustand.
///
/// Enthaelt alle aktiven Geraete, das Standardgeraet mit Lautstaerke und
/// Mute sowie dessen Anwendungs-Sitzungen.
pub async fn zustand_lesen(controller: &dyn AudioController) -> AudioResult<Snapshot> {
    let device_ids: BTreeMap<String, String> = controller
        .list_active_devices()
        .await?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect();

    let standard = controller.default_device().await?;
    let sessions = controller
        .sessions(&standard.referenz())
        .await?
        .into_iter()
        .map(|s| AudioSession {
            name: s.name,
            id: s.id,
            volume: s.lautstaerke,
            muted: s.stumm,
        })
        .collect();

    Ok(Snapshot::ausgehend(
        device_ids,
        DeviceState {
            device_id: Some(standard.id),
            name: Some(standard.name),
            master_volume: Some(standard.lautstaerke),
            master_muted: Some(standard.stumm),
            sessions,
        },
    ))
}
