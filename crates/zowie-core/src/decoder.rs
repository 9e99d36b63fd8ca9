// ── Decoder state machine ──
//
// Idle, Playing, Standby, Unavailable. `DecoderState::next` is the only
// way to move between them; illegal inputs leave the state untouched.

use serde::Serialize;

use crate::error::CoreError;
use crate::source::StreamSourceRef;

/// What the decoder is doing, as far as this library drove it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum DecoderState {
    #[default]
    Idle,
    Playing(StreamSourceRef),
    Standby,
    Unavailable,
}

/// Inputs that drive decoder transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderInput {
    Play(StreamSourceRef),
    Stop,
    Standby,
    Wake,
    DeviceUnreachable,
    DeviceReachable,
}

impl DecoderInput {
    fn action(&self) -> &'static str {
        match self {
            Self::Play(_) => "play",
            Self::Stop => "stop",
            Self::Standby => "enter standby",
            Self::Wake => "wake",
            Self::DeviceUnreachable => "mark unreachable",
            Self::DeviceReachable => "mark reachable",
        }
    }
}

impl DecoderState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing(_) => "playing",
            Self::Standby => "standby",
            Self::Unavailable => "unavailable",
        }
    }

    /// Validate `input` against the current state without applying it.
    pub fn check(&self, input: &DecoderInput) -> Result<(), CoreError> {
        self.next(input).map(|_| ())
    }

    /// The state after `input`.
    ///
    /// Stop and standby are idempotent; reachability only matters when it
    /// changes whether the device is Unavailable.
    pub fn next(&self, input: &DecoderInput) -> Result<Self, CoreError> {
        let next = match (self, input) {
            (_, DecoderInput::DeviceUnreachable) => Self::Unavailable,
            (Self::Unavailable, DecoderInput::DeviceReachable) => Self::Idle,
            (state, DecoderInput::DeviceReachable) => state.clone(),

            (Self::Idle | Self::Playing(_), DecoderInput::Play(source)) => {
                Self::Playing(source.clone())
            }
            (Self::Idle | Self::Playing(_), DecoderInput::Stop) => Self::Idle,
            (Self::Idle | Self::Playing(_) | Self::Standby, DecoderInput::Standby) => Self::Standby,
            (Self::Standby, DecoderInput::Wake) => Self::Idle,

            (Self::Unavailable, _) => return Err(CoreError::DeviceUnavailable),
            (state, input) => {
                return Err(CoreError::InvalidTransition {
                    action: input.action().into(),
                    state: state.name().into(),
                });
            }
        };
        Ok(next)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn source() -> StreamSourceRef {
        StreamSourceRef::url("rtsp://host/stream").unwrap()
    }

    #[test]
    fn play_stop_cycle() {
        let playing = DecoderState::Idle
            .next(&DecoderInput::Play(source()))
            .unwrap();
        assert_eq!(playing, DecoderState::Playing(source()));
        assert_eq!(playing.next(&DecoderInput::Stop).unwrap(), DecoderState::Idle);
    }

    #[test]
    fn standby_and_wake() {
        let standby = DecoderState::Playing(source())
            .next(&DecoderInput::Standby)
            .unwrap();
        assert_eq!(standby, DecoderState::Standby);
        assert!(standby.check(&DecoderInput::Play(source())).is_err());
        assert_eq!(standby.next(&DecoderInput::Wake).unwrap(), DecoderState::Idle);
    }

    #[test]
    fn wake_requires_standby() {
        let err = DecoderState::Idle.next(&DecoderInput::Wake).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn reachability() {
        for state in [
            DecoderState::Idle,
            DecoderState::Playing(source()),
            DecoderState::Standby,
        ] {
            let down = state.next(&DecoderInput::DeviceUnreachable).unwrap();
            assert_eq!(down, DecoderState::Unavailable);
            assert_eq!(state.next(&DecoderInput::DeviceReachable).unwrap(), state);
        }

        let unavailable = DecoderState::Unavailable;
        assert!(unavailable.check(&DecoderInput::Play(source())).is_err());
        assert!(matches!(
            unavailable.check(&DecoderInput::Stop),
            Err(CoreError::DeviceUnavailable)
        ));
        assert_eq!(
            unavailable.next(&DecoderInput::DeviceReachable).unwrap(),
            DecoderState::Idle
        );
    }
}
