/*
    FluxFox
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/engine/state.rs

    Command and phase states of the bit-clocked sector search machine.
*/

//! Each command runs through a fixed sequence of phases. READ TRACK and FORMAT TRACK first spin
//! to the index hole; every other command starts by searching for an ID address mark.
//!
//! Each state has a one-byte trace code, kept only for log output: the high bits select the
//! command family and the low bits the phase.

use strum::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum Command {
    #[strum(to_string = "READ SECTOR ID")]
    ReadSectorId,
    #[strum(to_string = "READ DATA")]
    ReadData,
    #[strum(to_string = "WRITE DATA")]
    WriteData,
    #[strum(to_string = "SCAN")]
    Scan,
    #[strum(to_string = "VERIFY")]
    Verify,
    #[strum(to_string = "READ DELETED DATA")]
    ReadDeleted,
    #[strum(to_string = "WRITE DELETED DATA")]
    WriteDeleted,
    #[strum(to_string = "READ TRACK")]
    ReadTrack,
    #[strum(to_string = "FORMAT TRACK")]
    FormatTrack,
}

impl Command {
    fn code_base(&self) -> u8 {
        match self {
            Command::ReadSectorId => 0x80,
            Command::ReadData => 0xA0,
            Command::WriteData => 0xA8,
            Command::Scan => 0xB0,
            Command::Verify => 0xB8,
            Command::ReadDeleted => 0xC0,
            Command::WriteDeleted => 0xC8,
            Command::ReadTrack => 0xE0,
            Command::FormatTrack => 0xE8,
        }
    }

    /// Return true if the command starts by waiting for the index hole.
    pub fn spins_to_index(&self) -> bool {
        matches!(self, Command::ReadTrack | Command::FormatTrack)
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Command::WriteData | Command::WriteDeleted)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    SpinToIndex,
    FindId,
    ReadId,
    FindData,
    /// The data field. For FORMAT TRACK, the whole track is written in this phase.
    Data,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EngineState {
    #[default]
    Idle,
    /// The drive can't read the track in its current configuration. Held until two index
    /// pulses have passed, then reported as a missing ID address mark.
    SectorNotFound,
    Active(Command, Phase),
}

impl EngineState {
    /// The first state of `command`.
    pub fn start(command: Command) -> Self {
        let phase = if command.spins_to_index() { Phase::SpinToIndex } else { Phase::FindId };
        EngineState::Active(command, phase)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, EngineState::Idle)
    }

    pub fn command(&self) -> Option<Command> {
        match self {
            EngineState::Active(command, _) => Some(*command),
            _ => None,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            EngineState::Active(_, phase) => Some(*phase),
            _ => None,
        }
    }

    /// The state following this one in its command's sequence. Idle states and the final
    /// phase don't advance.
    pub fn next(self) -> Self {
        let EngineState::Active(command, phase) = self else {
            return self;
        };
        let phase = match (command, phase) {
            (Command::FormatTrack, Phase::SpinToIndex) => Phase::Data,
            (_, Phase::SpinToIndex) => Phase::FindId,
            (_, Phase::FindId) => Phase::ReadId,
            (_, Phase::ReadId) => Phase::FindData,
            (_, Phase::FindData) | (_, Phase::Data) => Phase::Data,
        };
        EngineState::Active(command, phase)
    }

    /// Return to the ID search of the current command.
    pub fn retry(self) -> Self {
        match self {
            EngineState::Active(command, _) => EngineState::Active(command, Phase::FindId),
            _ => self,
        }
    }

    /// The one-byte code of the state, for logging.
    pub fn code(&self) -> u8 {
        match self {
            EngineState::Idle => 0x00,
            EngineState::SectorNotFound => 0x01,
            EngineState::Active(command, phase) => {
                let offset = match (command, phase) {
                    (Command::FormatTrack, Phase::SpinToIndex) => 0,
                    (Command::FormatTrack, _) => 1,
                    (Command::ReadTrack, Phase::SpinToIndex) => 0,
                    (Command::ReadTrack, p) => 1 + p.index_after_spin(),
                    (_, p) => p.index_after_spin(),
                };
                command.code_base() + offset
            }
        }
    }
}

impl Phase {
    fn index_after_spin(&self) -> u8 {
        match self {
            Phase::SpinToIndex | Phase::FindId => 0,
            Phase::ReadId => 1,
            Phase::FindData => 2,
            Phase::Data => 3,
        }
    }
}
