//! Screen-view wire format.
//!
//! Text messages carry JSON control data. Binary messages start with a
//! length byte `N`:
//!
//! ```text
//! N == 0 : [0x00][json ...]                  same meaning as a text message
//! N  > 0 : [N][hostname: N bytes][jpeg ...]  one frame for `hostname`
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_HOSTNAME_LEN: usize = u8::MAX as usize;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty binary message")]
    Empty,

    #[error("hostname length {declared} exceeds remaining {available} bytes")]
    Truncated { declared: usize, available: usize },

    #[error("hostname is not valid UTF-8: {0}")]
    Hostname(#[from] std::str::Utf8Error),

    #[error("invalid control JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hostname must be 1..=255 bytes, got {0}")]
    HostnameLength(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    StudentList {
        #[serde(default)]
        students: Vec<String>,
    },
    StudentConnected { hostname: String },
    StudentDisconnected { hostname: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenMessage {
    Control(ControlMessage),
    Frame { hostname: String, jpeg: Bytes },
}

pub fn decode_text(text: &str) -> Result<ControlMessage, FrameError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_binary(data: Bytes) -> Result<ScreenMessage, FrameError> {
    let Some(&len) = data.first() else {
        return Err(FrameError::Empty);
    };
    let len = len as usize;

    if len == 0 {
        let control = serde_json::from_slice(&data[1..])?;
        return Ok(ScreenMessage::Control(control));
    }

    let available = data.len() - 1;
    if len > available {
        return Err(FrameError::Truncated { declared: len, available });
    }

    let hostname = std::str::from_utf8(&data[1..1 + len])?.to_string();
    let jpeg = data.slice(1 + len..);
    Ok(ScreenMessage::Frame { hostname, jpeg })
}

pub fn encode_frame(hostname: &str, jpeg: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = hostname.len();
    if len == 0 || len > MAX_HOSTNAME_LEN {
        return Err(FrameError::HostnameLength(len));
    }
    let mut out = Vec::with_capacity(1 + len + jpeg.len());
    out.push(len as u8);
    out.extend_from_slice(hostname.as_bytes());
    out.extend_from_slice(jpeg);
    Ok(out)
}

/// The `N == 0` binary form of a control message.
pub fn encode_control(msg: &ControlMessage) -> Result<Vec<u8>, FrameError> {
    let mut out = vec![0u8];
    serde_json::to_writer(&mut out, msg)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

    #[test]
    fn test_decode_tagged_frame() {
        let raw = encode_frame("pc-07", JPEG).unwrap();
        assert_eq!(raw[0], 5);

        match decode_binary(Bytes::from(raw)).unwrap() {
            ScreenMessage::Frame { hostname, jpeg } => {
                assert_eq!(hostname, "pc-07");
                assert_eq!(&jpeg[..], JPEG);
            }
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_length_prefix_carries_json() {
        let mut raw = vec![0u8];
        raw.extend_from_slice(br#"{"type":"student_connected","hostname":"pc-02"}"#);
        let msg = decode_binary(Bytes::from(raw)).unwrap();
        assert_eq!(
            msg,
            ScreenMessage::Control(ControlMessage::StudentConnected { hostname: "pc-02".into() })
        );
    }

    #[test]
    fn test_text_and_binary_channels_agree() {
        let control = ControlMessage::StudentDisconnected { hostname: "pc-03".into() };
        let text = serde_json::to_string(&control).unwrap();
        assert_eq!(decode_text(&text).unwrap(), control);

        let binary = encode_control(&control).unwrap();
        assert_eq!(decode_binary(Bytes::from(binary)).unwrap(), ScreenMessage::Control(control));
    }

    #[test]
    fn test_student_list_and_unknown_types() {
        assert_eq!(
            decode_text(r#"{"type":"student_list","students":["a","b"]}"#).unwrap(),
            ControlMessage::StudentList { students: vec!["a".into(), "b".into()] }
        );
        assert_eq!(decode_text(r#"{"type":"quality_changed","q":70}"#).unwrap(), ControlMessage::Unknown);
    }

    #[test]
    fn test_malformed_binary_is_rejected() {
        assert!(matches!(decode_binary(Bytes::new()), Err(FrameError::Empty)));
        assert!(matches!(
            decode_binary(Bytes::from_static(&[9, b'p', b'c'])),
            Err(FrameError::Truncated { declared: 9, available: 2 })
        ));
        assert!(matches!(
            decode_binary(Bytes::from_static(&[2, 0xC3, 0x28, 0xFF])),
            Err(FrameError::Hostname(_))
        ));
        assert!(matches!(decode_binary(Bytes::from_static(b"\0{not json")), Err(FrameError::Json(_))));
    }

    #[test]
    fn test_frame_with_empty_jpeg_is_accepted() {
        let raw = encode_frame("pc-01", &[]).unwrap();
        match decode_binary(Bytes::from(raw)).unwrap() {
            ScreenMessage::Frame { hostname, jpeg } => {
                assert_eq!(hostname, "pc-01");
                assert!(jpeg.is_empty());
            }
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_rejects_bad_hostname_length() {
        assert!(matches!(encode_frame("", JPEG), Err(FrameError::HostnameLength(0))));
        let long = "x".repeat(256);
        assert!(matches!(encode_frame(&long, JPEG), Err(FrameError::HostnameLength(256))));
    }
}
