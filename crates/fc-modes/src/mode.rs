//! Named reaction modes and their valve tables.

use core::fmt;

use fc_core::{Position, ValveId};

/// A fixed combination of the `A`, `B`, `C` valve positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Gas Line A to the reactor, Gas Line B through the loops to vent.
    ContinuousA,
    /// Gas Line B to the reactor, Gas Line A through the loops to vent.
    ContinuousB,
    /// Baseline for dual-loop pulsing with loop A on the vent side.
    PulsesLoopA,
    /// Baseline for dual-loop pulsing with loop B on the vent side.
    PulsesLoopB,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::ContinuousA,
        Mode::ContinuousB,
        Mode::PulsesLoopA,
        Mode::PulsesLoopB,
    ];

    /// The commands that realise this mode, in issue order (A, then B, then C).
    pub fn commands(self) -> [(ValveId, Position); 3] {
        use fc_core::Position::{Off, On};
        let [a, b, c] = match self {
            Mode::ContinuousA => [Off, Off, Off],
            Mode::ContinuousB => [Off, On, Off],
            Mode::PulsesLoopA => [Off, Off, On],
            Mode::PulsesLoopB => [Off, On, On],
        };
        [(ValveId::A, a), (ValveId::B, b), (ValveId::C, c)]
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::ContinuousA => "continuous mode Gas Line A",
            Mode::ContinuousB => "continuous mode Gas Line B",
            Mode::PulsesLoopA => "pulses with gas loops (loop A vent side)",
            Mode::PulsesLoopB => "pulses with gas loops (loop B vent side)",
        }
    }

    /// Gas paths active once this mode is entered.
    pub fn topology(self) -> &'static str {
        match self {
            Mode::ContinuousA => "Gas Line A -> reactor ... Gas Line B -> loops -> vent",
            Mode::ContinuousB => "Gas Line B -> reactor ... Gas Line A -> loops -> vent",
            Mode::PulsesLoopA => "Gas Line B -> loop 2 -> reactor ... Gas Line A -> loop 1 -> vent",
            Mode::PulsesLoopB => "Gas Line A -> loop 2 -> reactor ... Gas Line B -> loop 1 -> vent",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
