//! NFC tags: payload decoding, classification and reader sessions.

use punch_common::{AppError, AppResult};
use serde::Serialize;

/// What a scanned tag points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TagResolution {
    /// The tag is bound to a restaurant.
    #[serde(rename_all = "camelCase")]
    Restaurant { restaurant_id: String },
    /// The tag carries a peer-to-peer handshake payload.
    Peer,
    /// Nothing matches.
    #[serde(rename_all = "camelCase")]
    Unknown { tag_id: String },
}

/// Classify a tag given the restaurant bound to it, if any.
///
/// A restaurant binding wins over a peer marker in the payload.
#[must_use]
pub fn classify(
    tag_id: &str,
    bound_restaurant_id: Option<&str>,
    payload_text: Option<&str>,
    peer_marker: &str,
) -> TagResolution {
    if let Some(id) = bound_restaurant_id {
        return TagResolution::Restaurant {
            restaurant_id: id.to_string(),
        };
    }

    if !peer_marker.is_empty() && payload_text.is_some_and(|text| text.contains(peer_marker)) {
        return TagResolution::Peer;
    }

    TagResolution::Unknown {
        tag_id: tag_id.to_string(),
    }
}

/// Decode the payload of an NDEF Text record.
///
/// Layout: a status byte (bit 7 set for UTF-16, low six bits the language
/// code length), the language code, then the text.
pub fn decode_text_record(payload: &[u8]) -> AppResult<String> {
    let (&status, rest) = payload
        .split_first()
        .ok_or_else(|| AppError::BadRequest("Empty NDEF text record".to_string()))?;

    let lang_len = usize::from(status & 0x3f);
    let text = rest.get(lang_len..).ok_or_else(|| {
        AppError::BadRequest("NDEF language code exceeds record length".to_string())
    })?;

    if status & 0x80 == 0 {
        return String::from_utf8(text.to_vec())
            .map_err(|e| AppError::BadRequest(format!("Invalid UTF-8 in NDEF record: {e}")));
    }

    if text.len() % 2 != 0 {
        return Err(AppError::BadRequest(
            "Odd byte count in UTF-16 NDEF record".to_string(),
        ));
    }
    let units: Vec<u16> = text
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    let decoded = String::from_utf16(&units)
        .map_err(|e| AppError::BadRequest(format!("Invalid UTF-16 in NDEF record: {e}")))?;
    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// A tag as read from hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTag {
    pub tag_id: String,
    /// Raw NDEF text record payload, when the tag has one
    pub payload: Option<Vec<u8>>,
}

impl ScannedTag {
    /// Decoded payload text; undecodable payloads are treated as absent.
    #[must_use]
    pub fn payload_text(&self) -> Option<String> {
        let payload = self.payload.as_deref()?;
        match decode_text_record(payload) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(tag_id = %self.tag_id, error = %e, "Ignoring undecodable tag payload");
                None
            }
        }
    }
}

/// Device NFC reader.
///
/// Implemented by the device shell. Only one session may be open at a time,
/// and every opened session must be released.
pub trait TagReader {
    /// Start listening for a tag.
    fn open(&mut self) -> AppResult<()>;

    /// Block until a tag is presented.
    fn read(&mut self) -> AppResult<ScannedTag>;

    /// Stop listening. Must be safe to call after a failed read.
    fn release(&mut self);
}

/// An open reader session, released when dropped.
pub struct TagSession<'a, R: TagReader> {
    reader: &'a mut R,
}

impl<'a, R: TagReader> TagSession<'a, R> {
    /// Open a session on `reader`.
    pub fn open(reader: &'a mut R) -> AppResult<Self> {
        reader.open()?;
        Ok(Self { reader })
    }

    /// Read one tag.
    pub fn read(&mut self) -> AppResult<ScannedTag> {
        self.reader.read()
    }
}

impl<R: TagReader> Drop for TagSession<'_, R> {
    fn drop(&mut self) {
        self.reader.release();
    }
}

/// Open a session, read one tag and release the reader, whatever the outcome.
pub fn read_once<R: TagReader>(reader: &mut R) -> AppResult<ScannedTag> {
    let mut session = TagSession::open(reader)?;
    session.read()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeReader {
        fail_read: bool,
        opened: u32,
        released: u32,
    }

    impl TagReader for FakeReader {
        fn open(&mut self) -> AppResult<()> {
            self.opened += 1;
            Ok(())
        }

        fn read(&mut self) -> AppResult<ScannedTag> {
            if self.fail_read {
                return Err(AppError::Internal("tag lost".to_string()));
            }
            Ok(ScannedTag {
                tag_id: "04:A2:19".to_string(),
                payload: None,
            })
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    fn text_record(lang: &str, text: &str) -> Vec<u8> {
        let mut payload = vec![lang.len() as u8];
        payload.extend_from_slice(lang.as_bytes());
        payload.extend_from_slice(text.as_bytes());
        payload
    }

    #[test]
    fn test_restaurant_binding_wins() {
        let resolution = classify("T1", Some("r1"), Some("punch:peer"), "punch:peer");
        assert_eq!(
            resolution,
            TagResolution::Restaurant {
                restaurant_id: "r1".to_string()
            }
        );
    }

    #[test]
    fn test_peer_marker() {
        assert_eq!(
            classify("T1", None, Some("hello punch:peer u1"), "punch:peer"),
            TagResolution::Peer
        );
        assert_eq!(
            classify("T1", None, Some("menu"), "punch:peer"),
            TagResolution::Unknown {
                tag_id: "T1".to_string()
            }
        );
    }

    #[test]
    fn test_decode_utf8_text_record() {
        let payload = text_record("en", "punch:peer");
        assert_eq!(decode_text_record(&payload).unwrap(), "punch:peer");
    }

    #[test]
    fn test_decode_utf16_text_record() {
        let mut payload = vec![0x80 | 2];
        payload.extend_from_slice(b"en");
        for unit in "hi".encode_utf16() {
            payload.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text_record(&payload).unwrap(), "hi");
    }

    #[test]
    fn test_decode_rejects_truncated_record() {
        assert!(decode_text_record(&[]).is_err());
        assert!(decode_text_record(&[5, b'e']).is_err());
    }

    #[test]
    fn test_session_released_on_success() {
        let mut reader = FakeReader::default();
        let tag = read_once(&mut reader).unwrap();

        assert_eq!(tag.tag_id, "04:A2:19");
        assert_eq!(reader.opened, 1);
        assert_eq!(reader.released, 1);
    }

    #[test]
    fn test_session_released_on_error() {
        let mut reader = FakeReader {
            fail_read: true,
            ..Default::default()
        };

        assert!(read_once(&mut reader).is_err());
        assert_eq!(reader.released, 1);
    }
}
