//! Wire messages exchanged with the game server
//!
//! Every frame starts with a one-byte kind tag; the remaining layout is
//! kind-specific (see [`tag`]). The server is built against the same table,
//! so any change here is a protocol break.

use crate::game::input::KeyCode;
use crate::game::state::{EntityPosition, Facing, Position};
use crate::net::framing::{FrameBuilder, FrameReader, StrField};

/// One-byte frame kind discriminants
pub mod tag {
    pub const CONNECTED_ACK: u8 = 0x01;
    pub const ENTITY_UPDATE: u8 = 0x02;
    pub const CHAT_TEXT: u8 = 0x03;
    pub const ENTITY_REMOVED: u8 = 0x04;
    pub const CONNECTION_COUNT: u8 = 0x05;
    pub const INPUT_COMMAND: u8 = 0x10;
    pub const CHAT_LINE: u8 = 0x11;
    pub const MOVE_TO: u8 = 0x12;
    pub const ERROR: u8 = 0x7F;
}

/// Press or release of a key, as forwarded to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Press = 0,
    Release = 1,
}

impl KeyAction {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(KeyAction::Press),
            1 => Some(KeyAction::Release),
            _ => None,
        }
    }
}

/// Commands originated by the local player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw key transition while in movement mode
    Input { action: KeyAction, key: KeyCode },
    /// One submitted line of chat (or slash command, interpreted by the server)
    Chat { text: String },
    /// Predicted local position after a simulation step
    MoveTo(Position),
}

impl Command {
    /// Encode this command as a wire frame
    pub fn encode(&self) -> Vec<u8> {
        encode(&Frame::from(self.clone()))
    }
}

/// A decoded wire message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Server accepted the connection and assigned us an id
    ConnectedAck { player_id: String },
    /// Full list of visible entities; replaces any previous list
    EntityUpdate { entities: Vec<EntityPosition> },
    /// Chat or system line to display
    ChatText { from: String, text: String },
    /// An entity left the world
    EntityRemoved { id: String },
    /// Number of connected players
    ConnectionCount { count: u32 },
    /// Key transition (client to server)
    InputCommand { action: KeyAction, key: KeyCode },
    /// Chat line (client to server)
    ChatLine { text: String },
    /// Position report (client to server)
    MoveTo(Position),
    /// Server-side error report
    Error { code: u16, message: String },
}

impl Frame {
    /// Wire tag of this frame
    pub fn tag(&self) -> u8 {
        match self {
            Frame::ConnectedAck { .. } => tag::CONNECTED_ACK,
            Frame::EntityUpdate { .. } => tag::ENTITY_UPDATE,
            Frame::ChatText { .. } => tag::CHAT_TEXT,
            Frame::EntityRemoved { .. } => tag::ENTITY_REMOVED,
            Frame::ConnectionCount { .. } => tag::CONNECTION_COUNT,
            Frame::InputCommand { .. } => tag::INPUT_COMMAND,
            Frame::ChatLine { .. } => tag::CHAT_LINE,
            Frame::MoveTo(_) => tag::MOVE_TO,
            Frame::Error { .. } => tag::ERROR,
        }
    }

    /// Short kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::ConnectedAck { .. } => "connected-ack",
            Frame::EntityUpdate { .. } => "entity-update",
            Frame::ChatText { .. } => "chat-text",
            Frame::EntityRemoved { .. } => "entity-removed",
            Frame::ConnectionCount { .. } => "connection-count",
            Frame::InputCommand { .. } => "input-command",
            Frame::ChatLine { .. } => "chat-line",
            Frame::MoveTo(_) => "move-to",
            Frame::Error { .. } => "error",
        }
    }
}

impl From<Command> for Frame {
    fn from(command: Command) -> Self {
        match command {
            Command::Input { action, key } => Frame::InputCommand { action, key },
            Command::Chat { text } => Frame::ChatLine { text },
            Command::MoveTo(pos) => Frame::MoveTo(pos),
        }
    }
}

/// Errors from decoding a frame. None of them are fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated frame")]
    Truncated,
    #[error("unknown frame tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("invalid {0} value")]
    InvalidField(&'static str),
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
}

/// Encode a frame
pub fn encode(frame: &Frame) -> Vec<u8> {
    let builder = FrameBuilder::new().write_u8(frame.tag());
    match frame {
        Frame::ConnectedAck { player_id } => builder.write_str(player_id),
        Frame::EntityUpdate { entities } => {
            let mut builder = builder.write_u32(entities.len() as u32);
            for entity in entities {
                builder = builder
                    .write_str(&entity.id)
                    .write_i32(entity.x)
                    .write_i32(entity.y)
                    .write_u8(entity.facing as u8);
            }
            builder
        }
        Frame::ChatText { from, text } => builder.write_str(from).write_str(text),
        Frame::EntityRemoved { id } => builder.write_str(id),
        Frame::ConnectionCount { count } => builder.write_u32(*count),
        Frame::InputCommand { action, key } => builder.write_u8(*action as u8).write_u32(key.0),
        Frame::ChatLine { text } => builder.write_str(text),
        Frame::MoveTo(pos) => builder
            .write_i32(pos.x)
            .write_i32(pos.y)
            .write_u8(pos.facing as u8),
        Frame::Error { code, message } => builder.write_u16(*code).write_str(message),
    }
    .build()
}

/// Decode a frame
pub fn decode(data: &[u8]) -> Result<Frame, DecodeError> {
    let mut reader = FrameReader::new(data);
    let kind = reader.read_u8().ok_or(DecodeError::Truncated)?;

    let frame = match kind {
        tag::CONNECTED_ACK => Frame::ConnectedAck {
            player_id: read_string(&mut reader)?,
        },
        tag::ENTITY_UPDATE => {
            let count = read_u32(&mut reader)? as usize;
            // Each entity needs at least 13 bytes; never trust the count for allocation
            let mut entities = Vec::with_capacity(count.min(reader.remaining().len() / 13));
            for _ in 0..count {
                let id = read_string(&mut reader)?;
                let x = read_i32(&mut reader)?;
                let y = read_i32(&mut reader)?;
                let facing = read_facing(&mut reader)?;
                entities.push(EntityPosition { id, x, y, facing });
            }
            Frame::EntityUpdate { entities }
        }
        tag::CHAT_TEXT => {
            let from = read_string(&mut reader)?;
            let text = read_string(&mut reader)?;
            Frame::ChatText { from, text }
        }
        tag::ENTITY_REMOVED => Frame::EntityRemoved {
            id: read_string(&mut reader)?,
        },
        tag::CONNECTION_COUNT => Frame::ConnectionCount {
            count: read_u32(&mut reader)?,
        },
        tag::INPUT_COMMAND => {
            let action = reader.read_u8().ok_or(DecodeError::Truncated)?;
            let key = read_u32(&mut reader)?;
            let action = KeyAction::from_u8(action).ok_or(DecodeError::InvalidField("key action"))?;
            Frame::InputCommand {
                action,
                key: KeyCode(key),
            }
        }
        tag::CHAT_LINE => Frame::ChatLine {
            text: read_string(&mut reader)?,
        },
        tag::MOVE_TO => {
            let x = read_i32(&mut reader)?;
            let y = read_i32(&mut reader)?;
            let facing = read_facing(&mut reader)?;
            Frame::MoveTo(Position { x, y, facing })
        }
        tag::ERROR => {
            let code = reader.read_u16().ok_or(DecodeError::Truncated)?;
            let message = read_string(&mut reader)?;
            Frame::Error { code, message }
        }
        other => return Err(DecodeError::UnknownTag(other)),
    };

    if reader.has_remaining() {
        return Err(DecodeError::TrailingBytes(reader.remaining().len()));
    }
    Ok(frame)
}

fn read_u32(reader: &mut FrameReader<'_>) -> Result<u32, DecodeError> {
    reader.read_u32().ok_or(DecodeError::Truncated)
}

fn read_i32(reader: &mut FrameReader<'_>) -> Result<i32, DecodeError> {
    reader.read_i32().ok_or(DecodeError::Truncated)
}

fn read_string(reader: &mut FrameReader<'_>) -> Result<String, DecodeError> {
    match reader.read_str() {
        Some(StrField::Ok(s)) => Ok(s.to_owned()),
        Some(StrField::InvalidUtf8) => Err(DecodeError::InvalidUtf8),
        None => Err(DecodeError::Truncated),
    }
}

fn read_facing(reader: &mut FrameReader<'_>) -> Result<Facing, DecodeError> {
    let raw = reader.read_u8().ok_or(DecodeError::Truncated)?;
    Facing::from_u8(raw).ok_or(DecodeError::InvalidField("facing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn sample_frames() -> Vec<Frame> {
        vec![
            Frame::ConnectedAck {
                player_id: "Anubis0".to_string(),
            },
            Frame::EntityUpdate {
                entities: vec![
                    EntityPosition::new("Ra1", 10, 10, Facing::East),
                    EntityPosition::new("Thoth3", 12, 9, Facing::South),
                ],
            },
            Frame::EntityUpdate { entities: vec![] },
            Frame::ChatText {
                from: "Isis2".to_string(),
                text: "hello, nexus".to_string(),
            },
            Frame::EntityRemoved {
                id: "Ra1".to_string(),
            },
            Frame::ConnectionCount { count: 7 },
            Frame::InputCommand {
                action: KeyAction::Release,
                key: KeyCode::ARROW_LEFT,
            },
            Frame::ChatLine {
                text: "ünïcödé".to_string(),
            },
            Frame::MoveTo(Position {
                x: -3,
                y: 154,
                facing: Facing::West,
            }),
            Frame::Error {
                code: 503,
                message: "server full".to_string(),
            },
        ]
    }

    #[test]
    fn test_command_roundtrip() {
        let commands = vec![
            Command::Input {
                action: KeyAction::Press,
                key: KeyCode::W,
            },
            Command::Chat {
                text: "/who".to_string(),
            },
            Command::Chat { text: String::new() },
            Command::MoveTo(Position {
                x: 127,
                y: 154,
                facing: Facing::South,
            }),
        ];

        for command in commands {
            let decoded = decode(&command.encode()).unwrap();
            assert_eq!(decoded, Frame::from(command));
        }
    }

    #[test]
    fn test_frame_roundtrip() {
        for frame in sample_frames() {
            assert_eq!(decode(&encode(&frame)).unwrap(), frame);
        }
    }

    #[test]
    fn test_every_truncation_is_truncated() {
        for frame in sample_frames() {
            let encoded = encode(&frame);
            for len in 1..encoded.len() {
                assert_eq!(
                    decode(&encoded[..len]),
                    Err(DecodeError::Truncated),
                    "{} cut to {} bytes",
                    frame.kind(),
                    len
                );
            }
        }
    }

    #[test]
    fn test_random_chat_truncation() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x7113);
        for _ in 0..200 {
            let len = rng.gen_range(0..40);
            let text: String = (0..len)
                .map(|_| rng.gen_range('a'..='z'))
                .collect();
            let encoded = Command::Chat { text }.encode();
            let cut = rng.gen_range(1..encoded.len());
            assert_eq!(decode(&encoded[..cut]), Err(DecodeError::Truncated));
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(&[]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(decode(&[0x42, 0, 0]), Err(DecodeError::UnknownTag(0x42)));
    }

    #[test]
    fn test_wire_layout_move_to() {
        let bytes = Command::MoveTo(Position {
            x: 1,
            y: -1,
            facing: Facing::East,
        })
        .encode();
        assert_eq!(
            bytes,
            vec![tag::MOVE_TO, 1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 1]
        );
    }

    #[test]
    fn test_invalid_facing() {
        let mut bytes = encode(&Frame::MoveTo(Position {
            x: 0,
            y: 0,
            facing: Facing::North,
        }));
        let last = bytes.len() - 1;
        bytes[last] = 9;
        assert_eq!(decode(&bytes), Err(DecodeError::InvalidField("facing")));
    }

    #[test]
    fn test_invalid_key_action() {
        let bytes = FrameBuilder::new()
            .write_u8(tag::INPUT_COMMAND)
            .write_u8(2)
            .write_u32(87)
            .build();
        assert_eq!(decode(&bytes), Err(DecodeError::InvalidField("key action")));
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = FrameBuilder::new()
            .write_u8(tag::CHAT_LINE)
            .write_u32(1)
            .write_u8(0xFF)
            .build();
        assert_eq!(decode(&bytes), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encode(&Frame::ConnectionCount { count: 1 });
        bytes.push(0);
        assert_eq!(decode(&bytes), Err(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn test_lying_entity_count() {
        // Claims a million entities but carries none
        let bytes = FrameBuilder::new()
            .write_u8(tag::ENTITY_UPDATE)
            .write_u32(1_000_000)
            .build();
        assert_eq!(decode(&bytes), Err(DecodeError::Truncated));
    }
}
