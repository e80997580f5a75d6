//! Cutline Playback Engine
//!
//! Real-time preview of a timeline:
//!
//! - **Transport**: wall-clock anchored play/stop/seek. The playhead is
//!   derived from anchors, never accumulated per tick.
//! - **Audio sync**: one voice per active audio item, drift-checked and
//!   gain-smoothed every tick.
//! - **Video lockstep**: per-item decoder positions chasing the
//!   playhead under the same drift rule.
//! - **Decode**: audio decode scheduling that never blocks the tick.
//!
//! `PlaybackSession` wires these together and emits a `FramePlan` per
//! tick for the preview surface to rasterize.

pub mod decode;
pub mod envelope;
pub mod session;
pub mod sync;
pub mod transport;
pub mod video;
pub mod voice;

pub use decode::{AudioBuffer, AudioDecoder, DecodeCache, DecodeState, SilenceDecoder};
pub use session::{PlaybackSession, PlaybackStats};
pub use sync::{AudioSyncEngine, SyncStats};
pub use transport::{Transport, TransportState};
pub use video::{
    LockstepStats, NullVideoStream, NullVideoStreamFactory, VideoLockstep, VideoStream,
    VideoStreamFactory,
};
pub use voice::{AudioVoice, NullVoice, NullVoiceFactory, VoiceFactory};
