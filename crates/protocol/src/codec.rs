//! StateCodec – eine JSON-Zeile pro Snapshot
//!
//! Die Zeilentrennung (`\n`) uebernimmt der Transport, dieses Modul kodiert
//! und dekodiert nur den Zeileninhalt. Ausgehende Zeilen sind reines ASCII:
//! Zeichen ausserhalb von ASCII werden in Strings als `\uXXXX` maskiert.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::{ProtokollFehler, ProtokollResult};
use crate::snapshot::{Snapshot, PROTOKOLL_VERSION};

/// Kodiert einen Snapshot als einzeiligen, ASCII-sicheren JSON-String
/// (ohne abschliessendes Newline).
pub fn kodieren(snapshot: &Snapshot) -> ProtokollResult<String> {
    let mut puffer = Vec::with_capacity(256);
    let mut serializer = serde_json::Serializer::with_formatter(&mut puffer, AsciiFormatter);
    snapshot.serialize(&mut serializer)?;
    String::from_utf8(puffer).map_err(|e| ProtokollFehler::Kodierung(e.to_string()))
}

/// Dekodiert eine empfangene Zeile. Die Version wird hier nicht geprueft,
/// siehe [`version_pruefen`].
pub fn dekodieren(zeile: &str) -> ProtokollResult<Snapshot> {
    Ok(serde_json::from_str(zeile.trim())?)
}

/// Prueft ob die Nachricht die Protokollversion dieses Dienstes traegt
pub fn version_pruefen(snapshot: &Snapshot) -> ProtokollResult<()> {
    if snapshot.protocol_version != PROTOKOLL_VERSION {
        return Err(ProtokollFehler::Version {
            erwartet: PROTOKOLL_VERSION,
            erhalten: snapshot.protocol_version,
        });
    }
    Ok(())
}

/// Kompakter JSON-Formatter, der Nicht-ASCII-Zeichen maskiert
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, zeichen) in fragment.char_indices() {
            if zeichen.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            let mut einheiten = [0u16; 2];
            for einheit in zeichen.encode_utf16(&mut einheiten) {
                write!(writer, "\\u{:04x}", einheit)?;
            }
            start = index + zeichen.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}
