//! Live-update line protocol.
//!
//! Every frame is one UTF-8 line terminated by `\n`. Payloads are escaped
//! before framing so that they never contain a raw newline: a newline becomes
//! the two characters `\n`. Backslashes are never escaped, so a payload that
//! already holds a literal backslash followed by `n` reads back as a newline.
//!
//! The server drives the conversation. Each line it sends is a command token,
//! optionally followed by a single space and a payload; the client answers
//! every command with exactly one line, except `DISCONNECT` and the empty
//! line, which end the connection without an answer.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::{Message, User};

/// A decoded server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Username,
    PubKey,
    /// Sign the payload (empty when the server sent none)
    Sign(String),
    Channel,
    Ack,
    Disconnect,
    Msg(Message),
    Online(User),
    Offline(User),
    /// Unrecognised command token; answered with `ACK`
    Unknown(String),
}

impl ServerCommand {
    /// Parse an already unescaped line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let (command, payload) = match line.split_once(' ') {
            Some((command, payload)) => (command, Some(payload)),
            None => (line, None),
        };

        match command {
            "" => Err(ProtocolError::EmptyLine),
            CMD_USERNAME => Ok(Self::Username),
            CMD_PUBKEY => Ok(Self::PubKey),
            CMD_SIGN => Ok(Self::Sign(payload.unwrap_or_default().to_string())),
            CMD_CHANNEL => Ok(Self::Channel),
            CMD_ACK => Ok(Self::Ack),
            CMD_DISCONNECT => Ok(Self::Disconnect),
            CMD_MSG => decode_payload(CMD_MSG, payload).map(Self::Msg),
            CMD_ONLINE => decode_payload(CMD_ONLINE, payload).map(Self::Online),
            CMD_OFFLINE => decode_payload(CMD_OFFLINE, payload).map(Self::Offline),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    command: &'static str,
    payload: Option<&str>,
) -> Result<T, ProtocolError> {
    let payload = payload.ok_or(ProtocolError::MissingPayload(command))?;
    serde_json::from_str(payload)
        .map_err(|source| ProtocolError::MalformedPayload { command, source })
}

/// Replace every raw newline with the two characters `\n`.
pub fn escape(payload: &str) -> String {
    payload.replace('\n', "\\n")
}

/// Turn every two-character `\n` back into a newline. Other backslashes are
/// left alone.
pub fn unescape(line: &str) -> String {
    line.replace("\\n", "\n")
}

/// Escape and terminate a payload, ready for the socket.
pub fn encode_line(payload: &str) -> Vec<u8> {
    let mut bytes = escape(payload).into_bytes();
    bytes.push(b'\n');
    bytes
}

/// Turn one raw frame (with or without its trailing `\n`) into an unescaped line.
pub fn decode_line(mut frame: Vec<u8>) -> Result<String, ProtocolError> {
    if frame.last() == Some(&b'\n') {
        frame.pop();
    }
    if frame.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong { max: MAX_LINE_LEN });
    }
    let raw = String::from_utf8(frame)?;
    Ok(unescape(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        let samples = [
            "",
            "plain",
            "two\nlines",
            "\n\n",
            "trailing backslash \\",
            "path C:\\temp\\b",
            "unicode é ✓\n",
        ];
        for s in samples {
            let escaped = escape(s);
            assert!(!escaped.contains('\n'), "raw newline in {escaped:?}");
            assert_eq!(unescape(&escaped), s);
        }
    }

    #[test]
    fn test_backslashes_pass_through() {
        assert_eq!(escape("a\\b"), "a\\b");
        assert_eq!(unescape("a\\b"), "a\\b");
        assert_eq!(unescape("a\\\\b"), "a\\\\b");
        assert_eq!(unescape("end\\"), "end\\");
    }

    #[test]
    fn test_json_backslash_escapes_survive_framing() {
        let frame = br#"MSG {"MessageId":"9","CreatorName":"x","Text":"C:\\temp and a\\b","CreatedAt":1,"Signature":"s"}"#;
        let line = decode_line(frame.to_vec()).unwrap();
        match ServerCommand::parse(&line).unwrap() {
            ServerCommand::Msg(msg) => assert_eq!(msg.text, "C:\\temp and a\\b"),
            other => panic!("unexpected {other:?}"),
        }

        let sign = decode_line(br"SIGN a\\b".to_vec()).unwrap();
        assert_eq!(
            ServerCommand::parse(&sign).unwrap(),
            ServerCommand::Sign("a\\\\b".into())
        );
    }

    #[test]
    fn test_encode_line_terminates() {
        assert_eq!(encode_line("ACK"), b"ACK\n".to_vec());
        assert_eq!(encode_line("a\nb"), b"a\\nb\n".to_vec());
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"SIGN a\\nb\n".to_vec()).unwrap(), "SIGN a\nb");
        assert_eq!(decode_line(b"ACK".to_vec()).unwrap(), "ACK");
        assert!(matches!(
            decode_line(vec![0xff, 0xfe, b'\n']),
            Err(ProtocolError::InvalidUtf8(_))
        ));
        assert!(matches!(
            decode_line(vec![b'a'; MAX_LINE_LEN + 1]),
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_parse_probes() {
        assert_eq!(ServerCommand::parse("USERNAME").unwrap(), ServerCommand::Username);
        assert_eq!(ServerCommand::parse("PUBKEY").unwrap(), ServerCommand::PubKey);
        assert_eq!(ServerCommand::parse("CHANNEL").unwrap(), ServerCommand::Channel);
        assert_eq!(ServerCommand::parse("ACK").unwrap(), ServerCommand::Ack);
        assert_eq!(
            ServerCommand::parse("DISCONNECT").unwrap(),
            ServerCommand::Disconnect
        );
    }

    #[test]
    fn test_parse_sign_takes_whole_remainder() {
        assert_eq!(
            ServerCommand::parse("SIGN hello world").unwrap(),
            ServerCommand::Sign("hello world".into())
        );
        assert_eq!(
            ServerCommand::parse("SIGN").unwrap(),
            ServerCommand::Sign(String::new())
        );
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(
            ServerCommand::parse("UNKNOWNCMD foo").unwrap(),
            ServerCommand::Unknown("UNKNOWNCMD".into())
        );
        assert!(matches!(
            ServerCommand::parse(""),
            Err(ProtocolError::EmptyLine)
        ));
        assert!(matches!(
            ServerCommand::parse(" leading space"),
            Err(ProtocolError::EmptyLine)
        ));
    }

    #[test]
    fn test_parse_events() {
        let line = r#"MSG {"MessageId":"7","CreatorName":"x","Text":"a b","CreatedAt":5,"Signature":"s"}"#;
        match ServerCommand::parse(line).unwrap() {
            ServerCommand::Msg(msg) => {
                assert_eq!(msg.id, "7");
                assert_eq!(msg.creator_name, "x");
                assert_eq!(msg.text, "a b");
            }
            other => panic!("unexpected {other:?}"),
        }

        let online = ServerCommand::parse(r#"ONLINE {"Username":"u","PublicKey":"k"}"#).unwrap();
        assert_eq!(online, ServerCommand::Online(User::new("u", "k")));

        let offline = ServerCommand::parse(r#"OFFLINE {"Username":"u","PublicKey":"k"}"#).unwrap();
        assert_eq!(offline, ServerCommand::Offline(User::new("u", "k")));
    }

    #[test]
    fn test_parse_malformed_payloads() {
        assert!(matches!(
            ServerCommand::parse("MSG"),
            Err(ProtocolError::MissingPayload("MSG"))
        ));
        assert!(matches!(
            ServerCommand::parse("ONLINE {not json"),
            Err(ProtocolError::MalformedPayload { command: "ONLINE", .. })
        ));
        assert!(matches!(
            ServerCommand::parse(r#"OFFLINE {"Username":"u"}"#),
            Err(ProtocolError::MalformedPayload { .. })
        ));
    }
}
