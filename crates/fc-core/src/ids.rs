use core::fmt;

/// Address of one selector valve on the manifold.
///
/// - `A`, `B`, `C` form the reaction-mode module and are fixed by rig wiring
/// - `D`..`I` select feed gases for the mixing lines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValveId {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
}

impl ValveId {
    /// Every address on the manifold, in bus order.
    pub const ALL: [ValveId; 9] = [
        ValveId::A,
        ValveId::B,
        ValveId::C,
        ValveId::D,
        ValveId::E,
        ValveId::F,
        ValveId::G,
        ValveId::H,
        ValveId::I,
    ];

    /// The reaction-mode module, in the order modes command it.
    pub const MODE_VALVES: [ValveId; 3] = [ValveId::A, ValveId::B, ValveId::C];

    pub fn letter(self) -> char {
        match self {
            ValveId::A => 'A',
            ValveId::B => 'B',
            ValveId::C => 'C',
            ValveId::D => 'D',
            ValveId::E => 'E',
            ValveId::F => 'F',
            ValveId::G => 'G',
            ValveId::H => 'H',
            ValveId::I => 'I',
        }
    }

    /// Parse a single-letter address. Accepts upper or lower case.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::from_letter(c)
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.letter() == c.to_ascii_uppercase())
    }

    /// Physical junction this valve switches, for status output.
    pub fn role(self) -> &'static str {
        match self {
            ValveId::A => "pulses-line loop selector",
            ValveId::B => "reactor-feed selector",
            ValveId::C => "reaction-mode selector",
            _ => "feed gas selector",
        }
    }
}

impl fmt::Display for ValveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Logical two-way valve position.
///
/// The physical meaning depends on the valve; for `C`, `Off` routes the
/// gas lines to the reactor and `On` routes them through the loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    #[cfg_attr(feature = "serde", serde(rename = "OFF"))]
    Off,
    #[cfg_attr(feature = "serde", serde(rename = "ON"))]
    On,
}

impl Position {
    /// Recognise one of the two position tokens, `"OFF"` or `"ON"`.
    ///
    /// Matching is exact. Anything else returns `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "OFF" => Some(Position::Off),
            "ON" => Some(Position::On),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Position::Off => "OFF",
            Position::On => "ON",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Position::Off => Position::On,
            Position::On => Position::Off,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_round_trip() {
        for v in ValveId::ALL {
            assert_eq!(ValveId::from_letter(v.letter()), Some(v));
        }
        assert_eq!(ValveId::parse("c"), Some(ValveId::C));
        assert_eq!(ValveId::parse("J"), None);
        assert_eq!(ValveId::parse("AB"), None);
        assert_eq!(ValveId::parse(""), None);
    }

    #[test]
    fn only_exact_tokens_are_positions() {
        assert_eq!(Position::from_token("ON"), Some(Position::On));
        assert_eq!(Position::from_token("OFF"), Some(Position::Off));
        for bad in ["on", "off", " ON", "OPEN", "", "1"] {
            assert_eq!(Position::from_token(bad), None, "token {bad:?}");
        }
    }

    #[test]
    fn toggled_flips() {
        assert_eq!(Position::On.toggled(), Position::Off);
        assert_eq!(Position::Off.toggled().toggled(), Position::Off);
    }
}
