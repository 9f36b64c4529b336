// adcon-core: domain model, streaming loader, and console facade.
//
// Consumers (the CLI, tests) talk to `Console`; the network mechanics live
// in `adcon-api`. The `loader` module owns the one piece of real machinery:
// the SSE-fed computer-list state machine.

pub mod config;
pub mod console;
pub mod error;
pub mod loader;
pub mod model;

pub use config::{ConsoleConfig, TlsVerification};
pub use console::Console;
pub use error::CoreError;
pub use loader::{ComputerListLoader, LoadState, LoaderSnapshot};
pub use model::{Computer, DirectoryUser, LapsPassword};
