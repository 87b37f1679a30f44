//! Game runtime: the state-owning engine, its prestige recovery and the
//! tokio actor that serializes ticks and player commands.

pub mod actor;
pub mod clock;
pub mod engine;
pub mod hook;
pub mod view;

pub use actor::{spawn, Command, EngineHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, TickReport};
pub use hook::{LogHook, NotificationHook};
pub use view::{ConformiteView, EngineSnapshot, StorageView};
