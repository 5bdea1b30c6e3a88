pub mod domain;
pub mod memory;
pub mod ports;
pub mod store;
pub mod timer;

pub use domain::{NewTask, Project, StoreState, Task, TaskPatch, TimerMode, TimerSnapshot};
pub use memory::InMemoryRepository;
pub use ports::{CompletionCue, PortError, PortResult, SilentCue, StateRepository};
pub use store::TaskStore;
pub use timer::{PomodoroTimer, TimerError, TimerEvent, TimerState};
