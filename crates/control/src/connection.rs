//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Ablauf:
//!
//! 1. Controller aus dem Cache holen, vollstaendigen Snapshot senden
//! 2. Zeile lesen, dekodieren, Protokollversion pruefen
//! 3. Update abgleichen, neuen Snapshot senden, weiter bei 2.
//!
//! Jeder Fehler beendet nur diese Verbindung. Ein Shutdown-Signal bricht
//! die Verarbeitung an jeder Stelle ab und schliesst den Socket.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use pcvolume_audio::{AudioCache, AudioController};
use pcvolume_protocol::{dekodieren, kodieren, version_pruefen};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::{Framed, LinesCodec};

use crate::abgleich::abgleichen;
use crate::error::ControlResult;
use crate::session::{SessionZustand, TcpSession};
use crate::zustand::zustand_lesen;

type ZeilenStream = Framed<TcpStream, LinesCodec>;

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection {
    cache: AudioCache,
    peer_addr: SocketAddr,
    zeilenlimit: usize,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection. `zeilenlimit` ist die maximale
    /// Laenge einer eingehenden Zeile in Bytes.
    pub fn neu(cache: AudioCache, peer_addr: SocketAddr, zeilenlimit: usize) -> Self {
        Self {
            cache,
            peer_addr,
            zeilenlimit,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Fehler auftritt oder `shutdown_rx`
    /// ein `true`-Signal empfaengt. Der Socket wird in jedem Fall geschlossen.
    pub async fn verarbeiten(self, stream: TcpStream, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        let mut session = TcpSession::neu(peer_addr);
        tracing::info!(peer = %peer_addr, sitzung = %session.id, "Neue Verbindung");

        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(self.zeilenlimit));

        let ergebnis = tokio::select! {
            ergebnis = self.ablauf(&mut framed, &mut session) => Some(ergebnis),
            _ = shutdown_abwarten(&mut shutdown_rx) => None,
        };

        match ergebnis {
            Some(Ok(())) => {
                tracing::info!(
                    peer = %peer_addr,
                    nachrichten = session.nachrichten,
                    dauer_ms = session.dauer().as_millis() as u64,
                    "Verbindung vom Client getrennt"
                );
            }
            Some(Err(e)) if *shutdown_rx.borrow() => {
                tracing::debug!(peer = %peer_addr, fehler = %e, "Fehler waehrend Shutdown");
            }
            Some(Err(e)) if e.ist_versionsfehler() => {
                tracing::warn!(peer = %peer_addr, fehler = %e, "Client spricht eine andere Protokollversion");
            }
            Some(Err(e)) => {
                tracing::error!(peer = %peer_addr, fehler = %e, "Verbindung mit Fehler beendet");
            }
            None => {
                tracing::info!(peer = %peer_addr, "Shutdown-Signal, Verbindung wird geschlossen");
            }
        }

        if let Err(e) = session.uebergang(SessionZustand::Getrennt) {
            tracing::debug!(peer = %peer_addr, fehler = %e, "Session bereits getrennt");
        }
        // framed wird hier gedroppt und schliesst den Socket
    }

    async fn ablauf(&self, framed: &mut ZeilenStream, session: &mut TcpSession) -> ControlResult<()> {
        let controller = self.cache.holen().await?;
        snapshot_senden(framed, controller.as_ref()).await?;
        drop(controller);
        session.uebergang(SessionZustand::WartetAufNachricht)?;

        while let Some(zeile) = framed.next().await {
            let zeile = zeile?;
            if zeile.trim().is_empty() {
                continue;
            }

            let update = dekodieren(&zeile)?;
            version_pruefen(&update)?;

            session.uebergang(SessionZustand::WendetAn)?;
            let controller = self.cache.holen().await?;
            let abgleich = abgleichen(controller.as_ref(), &update).await?;
            tracing::debug!(peer = %self.peer_addr, ?abgleich, "Update angewendet");

            snapshot_senden(framed, controller.as_ref()).await?;
            session.nachricht_verarbeitet();
            session.uebergang(SessionZustand::WartetAufNachricht)?;
        }

        Ok(())
    }
}

async fn snapshot_senden(framed: &mut ZeilenStream, controller: &dyn AudioController) -> ControlResult<()> {
    let snapshot = zustand_lesen(controller).await?;
    framed.send(kodieren(&snapshot)?).await?;
    Ok(())
}

/// Wartet bis `true` gesendet wird. Wurde der Sender gedroppt, ohne dass
/// ein Shutdown kam, kehrt die Funktion nie zurueck.
pub(crate) async fn shutdown_abwarten(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|aktiv| *aktiv).await.is_err() {
        std::future::pending::<()>().await;
    }
}
