//! Snapshot – Datenmodell des Steuerprotokolls
//!
//! Ein `Snapshot` ist der vollstaendige Audio-Zustand, der pro Nachricht in
//! beide Richtungen ausgetauscht wird. Ausgehend ist er immer vollstaendig
//! befuellt, eingehend darf jedes Feld fehlen ("unveraendert lassen").
//!
//! ## Wire-Format
//! - Feldnamen in lowerCamelCase
//! - Felder ohne Wert werden weggelassen (nie `null`)
//! - Unbekannte Felder werden beim Lesen ignoriert, `null` gilt als "fehlt"

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Protokollversion des Dienstes. Wird erhoeht, sobald sich das Wire-Format
/// inkompatibel aendert.
pub const PROTOKOLL_VERSION: i32 = 7;

/// Anzeigeversion des Dienstes (rein informativ)
pub const ANWENDUNGS_VERSION: &str = "v8";

/// Vollstaendiger Audio-Zustand einer Nachricht
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Muss exakt mit [`PROTOKOLL_VERSION`] uebereinstimmen
    #[serde(default, deserialize_with = "null_als_standard")]
    pub protocol_version: i32,
    /// Anzeigeversion der Gegenseite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_version: Option<String>,
    /// Geraete-ID -> Anzeigename, nur aktive Wiedergabegeraete
    #[serde(default, deserialize_with = "null_als_standard")]
    pub device_ids: BTreeMap<String, String>,
    /// Aktuelles bzw. gewuenschtes Standardgeraet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_device: Option<DeviceState>,
}

impl Snapshot {
    /// Erstellt einen ausgehenden Snapshot mit den Versionen dieses Dienstes
    pub fn ausgehend(device_ids: BTreeMap<String, String>, default_device: DeviceState) -> Self {
        Self {
            protocol_version: PROTOKOLL_VERSION,
            application_version: Some(ANWENDUNGS_VERSION.to_string()),
            device_ids,
            default_device: Some(default_device),
        }
    }
}

/// Zustand eines Wiedergabegeraets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Eindeutige Geraete-ID. Fehlt sie eingehend, bleibt das Geraet unveraendert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lautstaerke 0..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_muted: Option<bool>,
    /// Anwendungs-Sitzungen auf dem Geraet (nur beschreibend)
    #[serde(default, deserialize_with = "null_als_standard")]
    pub sessions: Vec<AudioSession>,
}

/// Audio-Sitzung einer einzelnen Anwendung
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSession {
    #[serde(deserialize_with = "null_als_standard")]
    pub name: String,
    #[serde(deserialize_with = "null_als_standard")]
    pub id: String,
    #[serde(deserialize_with = "null_als_standard")]
    pub volume: f64,
    #[serde(deserialize_with = "null_als_standard")]
    pub muted: bool,
}

// Explizites `null` wie ein fehlendes Feld behandeln
fn null_als_standard<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lautsprecher() -> DeviceState {
        DeviceState {
            device_id: Some("geraet-1".into()),
            name: Some("Lautsprecher".into()),
            master_volume: Some(40.0),
            master_muted: Some(false),
            sessions: vec![],
        }
    }

    #[test]
    fn ausgehend_setzt_versionen() {
        let snapshot = Snapshot::ausgehend(BTreeMap::new(), lautsprecher());
        assert_eq!(snapshot.protocol_version, PROTOKOLL_VERSION);
        assert_eq!(snapshot.application_version.as_deref(), Some(ANWENDUNGS_VERSION));
        assert!(snapshot.default_device.is_some());
    }

    #[test]
    fn feldnamen_in_camel_case() {
        let mut ids = BTreeMap::new();
        ids.insert("geraet-1".to_string(), "Lautsprecher".to_string());
        let json = serde_json::to_value(Snapshot::ausgehend(ids, lautsprecher())).unwrap();

        assert_eq!(json["protocolVersion"], 7);
        assert_eq!(json["applicationVersion"], "v8");
        assert_eq!(json["deviceIds"]["geraet-1"], "Lautsprecher");
        assert_eq!(json["defaultDevice"]["deviceId"], "geraet-1");
        assert_eq!(json["defaultDevice"]["masterVolume"], 40.0);
        assert_eq!(json["defaultDevice"]["masterMuted"], false);
        assert!(json["defaultDevice"]["sessions"].is_array());
    }

    #[test]
    fn leere_felder_werden_weggelassen() {
        let snapshot = Snapshot {
            protocol_version: PROTOKOLL_VERSION,
            default_device: Some(DeviceState {
                device_id: Some("geraet-1".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("null"));
        assert!(!json.contains("applicationVersion"));
        assert!(!json.contains("masterVolume"));
        assert!(!json.contains("masterMuted"));
    }

    #[test]
    fn teil_update_laesst_felder_leer() {
        let json = r#"{"protocolVersion":7,"defaultDevice":{"deviceId":"geraet-1","masterMuted":true}}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let geraet = snapshot.default_device.unwrap();
        assert_eq!(geraet.device_id.as_deref(), Some("geraet-1"));
        assert_eq!(geraet.master_muted, Some(true));
        assert_eq!(geraet.master_volume, None);
        assert!(snapshot.device_ids.is_empty());
    }

    #[test]
    fn null_werte_gelten_als_fehlend() {
        let json = r#"{"protocolVersion":7,"deviceIds":null,"defaultDevice":{"deviceId":null,"masterVolume":null,"sessions":null}}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.device_ids.is_empty());
        let geraet = snapshot.default_device.unwrap();
        assert!(geraet.device_id.is_none());
        assert!(geraet.master_volume.is_none());
        assert!(geraet.sessions.is_empty());
    }

    #[test]
    fn sitzungen_werden_gelesen() {
        let json = r#"{"defaultDevice":{"sessions":[{"name":"Player","id":"s1","volume":0.5,"muted":false},{"name":"Chat"}]}}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let sitzungen = snapshot.default_device.unwrap().sessions;
        assert_eq!(sitzungen.len(), 2);
        assert_eq!(sitzungen[0].id, "s1");
        assert_eq!(sitzungen[1].name, "Chat");
        assert_eq!(sitzungen[1].volume, 0.0);
    }
}
