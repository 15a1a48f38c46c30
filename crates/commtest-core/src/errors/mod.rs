mod model;

pub use model::{ConfigPathScope, Error, ExitCode, MachineError, Result};
