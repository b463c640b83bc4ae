//! Runtime adapters (tokio spawner, reaper task) and API surface.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod reaper_task;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

pub use api::{AcceptRequest, EntryResponse, JoinRequest, SessionSnapshot};
#[cfg(feature = "tokio-runtime")]
pub use reaper_task::{ExpiryReaper, ReaperHandle};
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;
