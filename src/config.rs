/// The system's top-level process. Never signalled, and the upper boundary
/// of every ancestor walk.
pub const INIT_PID: u32 = 1;

/// Command-name fragment that marks an interactive shell.
pub const DEFAULT_SHELL_MARKER: &str = "bash";

// Kernel TASK_COMM_LEN is 16 including the trailing NUL
pub const COMMAND_NAME_MAX_LEN: usize = 15;

pub const INITIAL_SNAPSHOT_CAPACITY: usize = 1024;

pub const SHELL_MARKERS_ENV: &str = "PROCTREE_SHELL_MARKERS";
pub const LOG_ENV: &str = "PROCTREE_LOG";

pub const CONFIG_DIRECTORY: &str = ".proctree";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Output line format for creation timestamps.
pub const CREATION_TIME_FORMAT: &str = "%a %d %b %Y %I:%M:%S %p %Z";
