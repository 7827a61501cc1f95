use serde_json::Value;

use crate::types::Direction;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Hello {
        name: String,
        seed: Option<u32>,
    },
    Start,
    Input {
        dir: Direction,
    },
    Pause,
    Resume,
    Close,
    Continue {
        accept: bool,
    },
    NextLevel,
    Restart,
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = match object.get("name") {
                None => String::new(),
                Some(value) => value.as_str()?.to_string(),
            };
            let seed = match object.get("seed") {
                None => None,
                Some(value) => Some(u32::try_from(value.as_u64()?).ok()?),
            };
            Some(ParsedClientMessage::Hello { name, seed })
        }
        "start" => Some(ParsedClientMessage::Start),
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Input { dir })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "resume" => Some(ParsedClientMessage::Resume),
        "close" => Some(ParsedClientMessage::Close),
        "continue" => {
            let accept = object.get("accept")?.as_bool()?;
            Some(ParsedClientMessage::Continue { accept })
        }
        "next_level" => Some(ParsedClientMessage::NextLevel),
        "restart" => Some(ParsedClientMessage::Restart),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}
