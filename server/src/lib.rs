//! pcvolume-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Audio-Cache und TCP-Steuerserver und stellt
//! den oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use config::ServerConfig;
use pcvolume_audio::{AudioCache, AudioControllerFabrik, SimuliertesAudioSystem};
use pcvolume_control::VolumeServer;
use pcvolume_protocol::{ANWENDUNGS_VERSION, PROTOKOLL_VERSION};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Haelt Konfiguration und Audio-Backend bis zum Start zusammen
pub struct Server {
    pub config: ServerConfig,
    fabrik: Arc<dyn AudioControllerFabrik>,
}

impl Server {
    /// Erstellt einen Server mit dem in der Konfiguration gewaehlten Backend
    pub fn neu(config: ServerConfig) -> Result<Self> {
        config.validieren()?;
        let fabrik = simuliertes_backend(&config)?;
        Ok(Self::mit_fabrik(config, fabrik))
    }

    /// Erstellt einen Server mit einem beliebigen Audio-Backend
    pub fn mit_fabrik(config: ServerConfig, fabrik: Arc<dyn AudioControllerFabrik>) -> Self {
        Self { config, fabrik }
    }

    /// Bindet den Listener und waermt den Audio-Controller vor.
    ///
    /// Verbindungen werden erst angenommen, wenn der zurueckgegebene
    /// [`LaufenderServer`] gestartet wird.
    pub async fn binden(self) -> Result<LaufenderServer> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let cache = AudioCache::neu(self.fabrik, self.config.cache_konfig(), shutdown_rx.clone())?;
        let aufwaermen = cache.aufwaermen();

        let server_konfig = self.config.server_konfig()?;
        let volume_server = VolumeServer::binden(server_konfig, cache.clone())
            .await
            .with_context(|| format!("Bind auf {} fehlgeschlagen", self.config.netzwerk.port))?;
        let adresse = volume_server.lokale_adresse()?;

        Ok(LaufenderServer {
            adresse,
            shutdown_tx,
            shutdown_rx,
            cache,
            aufwaermen,
            volume_server,
        })
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        self.binden().await?.bis_signal(ctrl_c()).await
    }
}

/// Gebundener Server, bereit zum Annehmen von Verbindungen
pub struct LaufenderServer {
    adresse: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    cache: AudioCache,
    aufwaermen: JoinHandle<()>,
    volume_server: VolumeServer,
}

impl LaufenderServer {
    /// Tatsaechlich gebundene Adresse
    pub fn adresse(&self) -> SocketAddr {
        self.adresse
    }

    pub fn cache(&self) -> &AudioCache {
        &self.cache
    }

    /// Nimmt Verbindungen an bis `signal` fertig ist oder der Listener
    /// ausfaellt. Danach werden alle Verbindungen geschlossen und der
    /// Audio-Controller freigegeben.
    pub async fn bis_signal<S>(self, signal: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let gestartet = Utc::now();
        tracing::info!(
            adresse = %self.adresse,
            protokoll = PROTOKOLL_VERSION,
            version = ANWENDUNGS_VERSION,
            lebensdauer_sek = self.cache.lebensdauer().as_secs(),
            gestartet = %gestartet.to_rfc3339(),
            "PcVolume-Steuerdienst laeuft"
        );

        let mut acceptor = tokio::spawn(self.volume_server.starten(self.shutdown_rx));

        let vorzeitig = tokio::select! {
            _ = signal => {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                None
            }
            ergebnis = &mut acceptor => Some(ergebnis),
        };

        // Listener, Verbindungen, Aufwaermen und Ablauf-Timer beobachten
        // dasselbe Signal
        let _ = self.shutdown_tx.send(true);

        let ergebnis = match vorzeitig {
            Some(ergebnis) => ergebnis,
            None => acceptor.await,
        };

        if let Err(e) = self.aufwaermen.await {
            tracing::warn!(fehler = %e, "Aufwaerm-Task abgebrochen");
        }
        self.cache.herunterfahren().await;

        let laufzeit = Utc::now() - gestartet;
        tracing::info!(
            beendet = %Utc::now().to_rfc3339(),
            laufzeit_sek = laufzeit.num_seconds(),
            "PcVolume-Steuerdienst gestoppt"
        );

        ergebnis
            .context("Accept-Task ist abgestuerzt")?
            .context("TCP-Steuerserver mit Fehler beendet")?;
        Ok(())
    }
}

fn simuliertes_backend(config: &ServerConfig) -> Result<Arc<dyn AudioControllerFabrik>> {
    let system = if config.audio.geraete.is_empty() {
        SimuliertesAudioSystem::beispiel()
    } else {
        SimuliertesAudioSystem::neu(config.audio.geraete.clone())?
    };
    let system =
        system.mit_konstruktionszeit(Duration::from_millis(config.audio.konstruktion_ms));
    tracing::info!(backend = %config.audio.backend, "Audio-Backend ausgewaehlt");
    Ok(Arc::new(system))
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht registriert werden");
    }
}
