//! Input capture, diff and replay primitives for frame-driven applications.
//!
//! This crate holds the shared data model and seams: snapshots of the whole
//! input state, the delta records that persist changes between snapshots,
//! the category mask selecting what gets recorded, and the proxy-chain
//! handles through which recorders and players splice themselves between a
//! host backend and application code.
//!
//! The capture and replay machinery built on top lives in
//! `cassette-recorder`.

pub mod error;
pub mod events;
pub mod mask;
pub mod pool;
pub mod proxy;
pub mod record;
pub mod snapshot;
pub mod source;

pub use error::{Error, ErrorCode, Result};
pub use events::{KeyEvent, KeyEventKind, PointerEvent, PointerEventKind};
pub use mask::CategoryMask;
pub use pool::SnapshotPool;
pub use proxy::{InputHandle, ListenerHandle};
pub use record::{
    DeltaRecord, KeyTransition, NativeOrientation, SessionProperties, StaticCapabilities,
    TextAnswer, TextPromptKind,
};
pub use snapshot::Snapshot;
pub use source::{InputListener, InputSource, TextInputListener};

pub mod prelude {
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::events::{KeyEvent, KeyEventKind, PointerEvent, PointerEventKind};
    pub use crate::mask::CategoryMask;
    pub use crate::proxy::{InputHandle, ListenerHandle};
    pub use crate::record::{
        DeltaRecord, KeyTransition, SessionProperties, StaticCapabilities, TextAnswer,
        TextPromptKind,
    };
    pub use crate::snapshot::Snapshot;
    pub use crate::source::{InputListener, InputSource, TextInputListener};
}
