//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `VolumeServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer
//! [`ClientConnection`]. Alle Verbindungen teilen sich denselben
//! [`AudioCache`].
//!
//! Ein Shutdown-Signal beendet die Accept-Loop sofort. Jede laufende
//! Verbindung beobachtet dasselbe Signal und schliesst ihren Socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pcvolume_audio::AudioCache;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::connection::{shutdown_abwarten, ClientConnection};
use crate::error::{ControlError, ControlResult};

/// Standard-Port des Steuerprotokolls
pub const STANDARD_PORT: u16 = 3500;

/// TCP-Server-Konfiguration
#[derive(Debug, Clone)]
pub struct ServerKonfig {
    pub bind_addr: SocketAddr,
    /// Obergrenze gleichzeitiger Verbindungen, `None` = unbegrenzt
    pub max_verbindungen: Option<usize>,
    pub zeilenlimit_bytes: usize,
}

impl Default for ServerKonfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], STANDARD_PORT)),
            max_verbindungen: None,
            zeilenlimit_bytes: 64 * 1024,
        }
    }
}

/// TCP-Steuerserver
pub struct VolumeServer {
    listener: TcpListener,
    konfig: ServerKonfig,
    cache: AudioCache,
    verbindungszaehler: Arc<AtomicUsize>,
}

impl VolumeServer {
    /// Bindet den Listener an `konfig.bind_addr`
    pub async fn binden(konfig: ServerKonfig, cache: AudioCache) -> ControlResult<Self> {
        let listener = TcpListener::bind(konfig.bind_addr).await?;
        Ok(Self {
            listener,
            konfig,
            cache,
            verbindungszaehler: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Tatsaechlich gebundene Adresse (relevant bei Port 0)
    pub fn lokale_adresse(&self) -> ControlResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Zaehler der aktuell offenen Verbindungen
    pub fn verbindungszaehler(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.verbindungszaehler)
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` ein `true`-Signal empfaengt.
    ///
    /// Ein Accept-Fehler ausserhalb des Shutdowns beendet den Server mit
    /// [`ControlError::Accept`].
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> ControlResult<()> {
        let shutdown_status = shutdown_rx.clone();
        tracing::info!(adresse = %self.lokale_adresse()?, "TCP-Steuerserver gestartet");

        loop {
            tokio::select! {
                ergebnis = self.listener.accept() => {
                    match ergebnis {
                        Ok((stream, peer_addr)) => {
                            self.verbindung_starten(stream, peer_addr, shutdown_status.clone());
                        }
                        Err(e) => {
                            let shutdown_angefordert = *shutdown_status.borrow();
                            accept_fehler_einordnen(e, shutdown_angefordert)?;
                            break;
                        }
                    }
                }

                _ = shutdown_abwarten(&mut shutdown_rx) => {
                    tracing::info!("Steuerserver: Shutdown-Signal empfangen");
                    break;
                }
            }
        }

        tracing::info!("TCP-Steuerserver gestoppt");
        Ok(())
    }

    fn verbindung_starten(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        let aktuelle = self.verbindungszaehler.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = self.konfig.max_verbindungen {
            if aktuelle >= max {
                self.verbindungszaehler.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!(
                    peer = %peer_addr,
                    max,
                    "Verbindung abgelehnt: Connection-Limit erreicht"
                );
                // Stream wird durch Drop geschlossen
                return;
            }
        }

        tracing::debug!(peer = %peer_addr, offen = aktuelle + 1, "Verbindung akzeptiert");

        let verbindung =
            ClientConnection::neu(self.cache.clone(), peer_addr, self.konfig.zeilenlimit_bytes);
        let zaehler = Arc::clone(&self.verbindungszaehler);

        tokio::spawn(async move {
            verbindung.verarbeiten(stream, shutdown_rx).await;
            zaehler.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

/// Ein Accept-Fehler waehrend des Shutdowns beendet die Loop regulaer
/// (`Ok`), sonst ist er fatal fuer den ganzen Server.
fn accept_fehler_einordnen(fehler: std::io::Error, shutdown_angefordert: bool) -> ControlResult<()> {
    if shutdown_angefordert {
        tracing::debug!(fehler = %fehler, "Accept-Fehler waehrend Shutdown");
        return Ok(());
    }
    tracing::error!(fehler = %fehler, "TCP-Accept-Fehler, Server wird beendet");
    Err(ControlError::Accept(fehler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn accept_fehler_ohne_shutdown_ist_fatal() {
        let fehler = io::Error::new(io::ErrorKind::Other, "zu viele offene Dateien");
        let ergebnis = accept_fehler_einordnen(fehler, false);
        assert!(matches!(ergebnis, Err(ControlError::Accept(e)) if e.kind() == io::ErrorKind::Other));
    }

    #[test]
    fn accept_fehler_im_shutdown_wird_unterdrueckt() {
        let fehler = io::Error::new(io::ErrorKind::ConnectionAborted, "Listener geschlossen");
        assert!(accept_fehler_einordnen(fehler, true).is_ok());
    }

    #[test]
    fn standard_konfig() {
        let konfig = ServerKonfig::default();
        assert_eq!(konfig.bind_addr.port(), 3500);
        assert!(konfig.bind_addr.ip().is_unspecified());
        assert!(konfig.max_verbindungen.is_none());
        assert_eq!(konfig.zeilenlimit_bytes, 65536);
    }
}
