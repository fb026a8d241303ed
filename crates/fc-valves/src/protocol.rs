//! Command encoding and reply parsing for the valve actuator protocol.

use fc_core::{FcError, FcResult, Position, ValveId};

/// Line terminator appended to every outgoing command.
pub const TERMINATOR: &str = "\r";

/// Verbosity of the unsolicited message sent after each actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageMode {
    Silent,
    Short,
    Large,
}

/// One request addressed to a single valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveCommand {
    /// `CW` drives to position "A" (`OFF`), `CC` to position "B" (`ON`).
    MoveTo(Position),
    CurrentPosition,
    Toggle,
    /// `None` queries the current message mode.
    MessageMode(Option<MessageMode>),
    CommandList,
    Settings,
    ActuationTime,
    PortCount,
}

impl ValveCommand {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ValveCommand::MoveTo(Position::Off) => "CW",
            ValveCommand::MoveTo(Position::On) => "CC",
            ValveCommand::CurrentPosition => "CP",
            ValveCommand::Toggle => "TO",
            ValveCommand::MessageMode(Some(MessageMode::Silent)) => "IFM0",
            ValveCommand::MessageMode(Some(MessageMode::Short)) => "IFM1",
            ValveCommand::MessageMode(Some(MessageMode::Large)) => "IFM2",
            ValveCommand::MessageMode(None) => "IFM",
            ValveCommand::CommandList => "?",
            ValveCommand::Settings => "STAT",
            ValveCommand::ActuationTime => "TM",
            ValveCommand::PortCount => "NP",
        }
    }

    /// Encode without the terminator; links append it.
    pub fn encode(self, valve: ValveId) -> String {
        format!("/{}{}", valve.letter(), self.mnemonic())
    }
}

/// Parsed answer to a `CP` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionReply {
    /// Address character echoed by the actuator.
    pub valve: char,
    /// `None` when the reported letter is neither `A` nor `B`.
    pub position: Option<Position>,
}

/// Parse a `CP` reply such as `/A CP "B"`.
///
/// The second character is the echoed address and the second-to-last
/// character is the position letter.
pub fn parse_position_reply(reply: &str) -> FcResult<PositionReply> {
    let chars: Vec<char> = reply.trim().chars().collect();
    if chars.len() < 3 {
        return Err(FcError::Protocol {
            what: format!("position reply too short: {reply:?}"),
        });
    }
    let position = match chars[chars.len() - 2] {
        'A' => Some(Position::Off),
        'B' => Some(Position::On),
        _ => None,
    };
    Ok(PositionReply {
        valve: chars[1],
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_commands_encode_direction() {
        assert_eq!(ValveCommand::MoveTo(Position::Off).encode(ValveId::A), "/ACW");
        assert_eq!(ValveCommand::MoveTo(Position::On).encode(ValveId::C), "/CCC");
        assert_eq!(ValveCommand::Toggle.encode(ValveId::A), "/ATO");
    }

    #[test]
    fn query_commands_encode() {
        assert_eq!(ValveCommand::CurrentPosition.encode(ValveId::H), "/HCP");
        assert_eq!(
            ValveCommand::MessageMode(Some(MessageMode::Short)).encode(ValveId::B),
            "/BIFM1"
        );
        assert_eq!(ValveCommand::MessageMode(None).encode(ValveId::B), "/BIFM");
        assert_eq!(ValveCommand::CommandList.encode(ValveId::D), "/D?");
    }

    #[test]
    fn parses_position_letters() {
        let on = parse_position_reply("/A Position is \"B\"\r\n").unwrap();
        assert_eq!(on.valve, 'A');
        assert_eq!(on.position, Some(Position::On));

        let off = parse_position_reply("/CCP\"A\"").unwrap();
        assert_eq!(off.valve, 'C');
        assert_eq!(off.position, Some(Position::Off));

        let unknown = parse_position_reply("/BCP\"X\"").unwrap();
        assert_eq!(unknown.position, None);
    }

    #[test]
    fn short_reply_is_protocol_error() {
        assert!(parse_position_reply("").is_err());
        assert!(parse_position_reply("/A").is_err());
    }
}
