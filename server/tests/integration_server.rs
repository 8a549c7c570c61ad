//! Start und Shutdown des kompletten Dienstes

use std::sync::Arc;
use std::time::Duration;

use pcvolume_audio::SimuliertesAudioSystem;
use pcvolume_protocol::dekodieren;
use pcvolume_server::{config::ServerConfig, Server};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;

const WARTEZEIT: Duration = Duration::from_secs(5);

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.netzwerk.bind_adresse = "127.0.0.1".into();
    config.netzwerk.port = 0;
    config
}

#[tokio::test]
async fn aufwaermen_erzeugt_controller_vor_dem_ersten_client() {
    let system = SimuliertesAudioSystem::beispiel();
    let server = Server::mit_fabrik(test_config(), Arc::new(system.clone()));
    let laufend = server.binden().await.unwrap();

    timeout(WARTEZEIT, async {
        while system.erzeugt() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Controller wurde nicht vorgewaermt");

    assert!(laufend.cache().ist_belegt().await);
    assert_eq!(laufend.cache().erzeugungen(), 1);
}

#[tokio::test]
async fn client_sitzung_und_shutdown() {
    let system = SimuliertesAudioSystem::beispiel();
    let server = Server::mit_fabrik(test_config(), Arc::new(system.clone()));
    let laufend = server.binden().await.unwrap();
    let adresse = laufend.adresse();

    let (stopp_tx, stopp_rx) = oneshot::channel::<()>();
    let dienst = tokio::spawn(laufend.bis_signal(async {
        let _ = stopp_rx.await;
    }));

    let stream = timeout(WARTEZEIT, TcpStream::connect(adresse))
        .await
        .unwrap()
        .unwrap();
    let (lesen, mut schreiben) = stream.into_split();
    let mut zeilen = BufReader::new(lesen).lines();

    let erste = timeout(WARTEZEIT, zeilen.next_line()).await.unwrap().unwrap().unwrap();
    let snapshot = dekodieren(&erste).unwrap();
    assert_eq!(snapshot.protocol_version, 7);

    schreiben
        .write_all(b"{\"protocolVersion\":7,\"defaultDevice\":{\"masterVolume\":90}}\n")
        .await
        .unwrap();
    let antwort = timeout(WARTEZEIT, zeilen.next_line()).await.unwrap().unwrap().unwrap();
    let geraet = dekodieren(&antwort).unwrap().default_device.unwrap();
    assert_eq!(geraet.master_volume, Some(42.0));

    stopp_tx.send(()).unwrap();
    let ergebnis = timeout(WARTEZEIT, dienst).await.unwrap().unwrap();
    assert!(ergebnis.is_ok());

    // Verbindung geschlossen, Controller freigegeben
    let rest = timeout(WARTEZEIT, zeilen.next_line()).await.unwrap();
    assert!(matches!(rest, Ok(None) | Err(_)));
    assert_eq!(system.freigegeben(), system.erzeugt());
    assert_eq!(system.erzeugt(), 1);
}

#[tokio::test]
async fn belegter_port_ist_fehler() {
    let belegt = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = test_config();
    config.netzwerk.port = belegt.local_addr().unwrap().port();

    let server = Server::mit_fabrik(config, Arc::new(SimuliertesAudioSystem::beispiel()));
    assert!(server.binden().await.is_err());
}
