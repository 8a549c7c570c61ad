//! TCP-Session – Zustand einer einzelnen Client-Verbindung
//!
//! ```text
//! Verbunden -> WartetAufNachricht <-> WendetAn
//!     |               |                  |
//!     +---------------+------------------+--> Getrennt
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{ControlError, ControlResult};

/// Zustand einer TCP-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionZustand {
    /// Verbunden, initialer Snapshot noch nicht gesendet
    Verbunden,
    /// Wartet auf die naechste Zeile des Clients
    WartetAufNachricht,
    /// Ein Update wird gerade angewendet
    WendetAn,
    /// Verbindung beendet
    Getrennt,
}

/// Eine aktive TCP-Session
#[derive(Debug)]
pub struct TcpSession {
    pub id: Uuid,
    pub zustand: SessionZustand,
    pub client_addr: SocketAddr,
    /// Anzahl verarbeiteter Updates
    pub nachrichten: u64,
    verbunden_seit: Instant,
}

impl TcpSession {
    pub fn neu(client_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            zustand: SessionZustand::Verbunden,
            client_addr,
            nachrichten: 0,
            verbunden_seit: Instant::now(),
        }
    }

    /// Wechselt in den naechsten Zustand. Nach `Getrennt` ist kein Wechsel
    /// mehr moeglich.
    pub fn uebergang(&mut self, nach: SessionZustand) -> ControlResult<()> {
        use SessionZustand::*;

        let erlaubt = matches!(
            (self.zustand, nach),
            (Verbunden, WartetAufNachricht)
                | (WartetAufNachricht, WendetAn)
                | (WendetAn, WartetAufNachricht)
                | (Verbunden | WartetAufNachricht | WendetAn, Getrennt)
        );
        if !erlaubt {
            return Err(ControlError::Zustandswechsel {
                von: self.zustand,
                nach,
            });
        }

        tracing::trace!(sitzung = %self.id, von = ?self.zustand, nach = ?nach, "Zustandswechsel");
        self.zustand = nach;
        Ok(())
    }

    pub fn nachricht_verarbeitet(&mut self) {
        self.nachrichten += 1;
    }

    pub fn ist_getrennt(&self) -> bool {
        self.zustand == SessionZustand::Getrennt
    }

    pub fn dauer(&self) -> Duration {
        self.verbunden_seit.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:12345".parse().unwrap()
    }

    #[test]
    fn neue_session_ist_verbunden() {
        let session = TcpSession::neu(test_addr());
        assert_eq!(session.zustand, SessionZustand::Verbunden);
        assert_eq!(session.nachrichten, 0);
        assert!(!session.ist_getrennt());
    }

    #[test]
    fn session_id_ist_eindeutig() {
        let s1 = TcpSession::neu(test_addr());
        let s2 = TcpSession::neu(test_addr());
        assert_ne!(s1.id, s2.id);
    }

    #[test]
    fn normaler_ablauf() {
        let mut session = TcpSession::neu(test_addr());
        session.uebergang(SessionZustand::WartetAufNachricht).unwrap();
        for _ in 0..3 {
            session.uebergang(SessionZustand::WendetAn).unwrap();
            session.nachricht_verarbeitet();
            session.uebergang(SessionZustand::WartetAufNachricht).unwrap();
        }
        session.uebergang(SessionZustand::Getrennt).unwrap();
        assert_eq!(session.nachrichten, 3);
        assert!(session.ist_getrennt());
    }

    #[test]
    fn ungueltige_wechsel_werden_abgelehnt() {
        let mut session = TcpSession::neu(test_addr());
        assert!(matches!(
            session.uebergang(SessionZustand::WendetAn),
            Err(ControlError::Zustandswechsel {
                von: SessionZustand::Verbunden,
                nach: SessionZustand::WendetAn
            })
        ));
        assert_eq!(session.zustand, SessionZustand::Verbunden);

        session.uebergang(SessionZustand::Getrennt).unwrap();
        assert!(session.uebergang(SessionZustand::WartetAufNachricht).is_err());
        assert!(session.uebergang(SessionZustand::Getrennt).is_err());
    }
}
