//! Output voices: where synchronized audio actually goes.
//!
//! The sync engine drives voices through this trait so the engine itself
//! stays device-free. Real implementations wrap an output stream; the
//! null implementation backs headless runs and tests.

use cutline_common::CutlineResult;

use crate::decode::AudioBuffer;

/// One playing audio stream.
pub trait AudioVoice: Send {
    /// Begin playback `at_secs` into the buffer.
    fn start(&mut self, buffer: &AudioBuffer, at_secs: f64) -> CutlineResult<()>;

    /// Jump to a new media position, keeping the voice alive.
    fn seek(&mut self, to_secs: f64) -> CutlineResult<()>;

    /// Set output gain in [0, 1]. Takes effect on the next device buffer.
    fn set_gain(&mut self, gain: f64);

    /// Media position the output clock reports, in seconds.
    fn position_secs(&self) -> f64;

    /// Silence and release the voice. Must take effect before returning.
    fn stop(&mut self);
}

/// Creates voices on demand, one per active audio item.
pub trait VoiceFactory: Send {
    fn create(&mut self) -> Box<dyn AudioVoice>;
}

/// A voice that tracks positions but produces no sound. It advances its
/// reported position only through `start`/`seek`, which makes drift
/// behavior fully controllable in tests and backs headless sessions
/// that have no audio device.
#[derive(Debug, Default)]
pub struct NullVoice {
    position_secs: f64,
}

impl AudioVoice for NullVoice {
    fn start(&mut self, _buffer: &AudioBuffer, at_secs: f64) -> CutlineResult<()> {
        self.position_secs = at_secs;
        Ok(())
    }

    fn seek(&mut self, to_secs: f64) -> CutlineResult<()> {
        self.position_secs = to_secs;
        Ok(())
    }

    fn set_gain(&mut self, _gain: f64) {}

    fn position_secs(&self) -> f64 {
        self.position_secs
    }

    fn stop(&mut self) {}
}

/// Factory for [`NullVoice`].
#[derive(Debug, Default)]
pub struct NullVoiceFactory;

impl VoiceFactory for NullVoiceFactory {
    fn create(&mut self) -> Box<dyn AudioVoice> {
        Box::new(NullVoice::default())
    }
}
