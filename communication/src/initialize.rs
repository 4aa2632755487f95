//! Initialization logic: spawning one worker thread per simulated process.

use std::thread;

use thiserror::Error;
use tracing::debug;

use crate::process::{Process, ProcessBuilder};

/// Things that can go wrong while assembling or running the worker group.
///
/// Everything past setup is fatal by design: a failed worker means the whole collective has
/// failed, and its panic is surfaced when the guards are joined.
#[derive(Debug, Error)]
pub enum InitError {
    /// The supplied arguments did not describe a valid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker {index}: {error}")]
    Spawn {
        /// Index of the worker that could not be spawned.
        index: usize,
        /// The underlying spawn failure.
        error: std::io::Error,
    },
    /// A worker thread panicked; the payload's message, if any, is included.
    #[error("worker thread panicked: {0}")]
    Worker(String),
}

/// Possible configurations of the communication fabric.
pub enum Configuration {
    /// Use one worker thread.
    Thread,
    /// Use one process with an indicated number of worker threads.
    Process(usize),
}

impl Configuration {
    /// Returns a `getopts::Options` struct that can be used to print
    /// usage information in higher-level tools.
    #[cfg(feature = "arg_parse")]
    pub fn options() -> getopts::Options {
        let mut opts = getopts::Options::new();
        opts.optopt("w", "workers", "number of worker threads", "NUM");
        opts
    }

    /// Constructs a new configuration by parsing supplied text arguments.
    ///
    /// Most commonly, this uses `std::env::args()` as the supplied iterator.
    #[cfg(feature = "arg_parse")]
    pub fn from_args<I: Iterator<Item = String>>(args: I) -> Result<Configuration, InitError> {
        let matches = Configuration::options()
            .parse(args)
            .map_err(|e| InitError::Config(e.to_string()))?;

        let workers = match matches.opt_str("w") {
            Some(text) => text
                .parse()
                .map_err(|_| InitError::Config(format!("worker count '{}' is not a number", text)))?,
            None => 1,
        };

        if workers == 0 {
            return Err(InitError::Config("worker count must be at least one".to_owned()));
        }
        if workers > 1 {
            Ok(Configuration::Process(workers))
        } else {
            Ok(Configuration::Thread)
        }
    }

    /// Attempts to assemble the described communication infrastructure.
    pub fn try_build(self) -> Result<Vec<ProcessBuilder>, InitError> {
        match self {
            Configuration::Thread => Ok(ProcessBuilder::new_vector(1)),
            Configuration::Process(0) => {
                Err(InitError::Config("worker count must be at least one".to_owned()))
            }
            Configuration::Process(workers) => Ok(ProcessBuilder::new_vector(workers)),
        }
    }
}

/// Initializes communication and executes an SPMD computation.
///
/// This method spawns one worker thread per configured rank and invokes the supplied
/// function with each worker's communicator. It returns a [`WorkerGuards`] which can be
/// `join`ed to retrieve the return values (or errors) of the workers.
///
/// # Examples
/// ```
/// use cubesort_communication::{initialize, Communicator, Configuration};
///
/// let guards = initialize(Configuration::Process(3), |mut comm| {
///     comm.barrier();
///     comm.rank()
/// }).unwrap();
///
/// for (index, rank) in guards.join().into_iter().enumerate() {
///     assert_eq!(rank.unwrap(), index);
/// }
/// ```
pub fn initialize<T, F>(config: Configuration, func: F) -> Result<WorkerGuards<T>, InitError>
where
    T: Send + 'static,
    F: Fn(Process) -> T + Send + Sync + 'static,
{
    initialize_from(config.try_build()?, func)
}

/// Initializes computation from an explicit list of endpoint builders.
///
/// This version of `initialize` is useful when the builders come from somewhere other than
/// a [`Configuration`], for example when interleaving the worker group with other channels
/// over the same lane map.
pub fn initialize_from<T, F>(builders: Vec<ProcessBuilder>, func: F) -> Result<WorkerGuards<T>, InitError>
where
    T: Send + 'static,
    F: Fn(Process) -> T + Send + Sync + 'static,
{
    let logic = std::sync::Arc::new(func);
    let mut guards = Vec::with_capacity(builders.len());
    for (index, builder) in builders.into_iter().enumerate() {
        let clone = logic.clone();
        debug!(index, "spawning worker");
        guards.push(
            thread::Builder::new()
                .name(format!("cubesort:work-{}", index))
                .spawn(move || {
                    let communicator = builder.build();
                    (*clone)(communicator)
                })
                .map_err(|error| InitError::Spawn { index, error })?,
        );
    }

    Ok(WorkerGuards { guards })
}

/// Maintains `JoinHandle`s for worker threads.
pub struct WorkerGuards<T: Send + 'static> {
    guards: Vec<thread::JoinHandle<T>>,
}

impl<T: Send + 'static> WorkerGuards<T> {
    /// Provides access to the join handles without consuming them.
    pub fn guards(&self) -> &[thread::JoinHandle<T>] {
        &self.guards[..]
    }

    /// Waits on the worker threads and returns the results they produce.
    pub fn join(mut self) -> Vec<Result<T, InitError>> {
        self.guards
            .drain(..)
            .map(|guard| guard.join().map_err(|payload| InitError::Worker(panic_message(&payload))))
            .collect()
    }
}

impl<T: Send + 'static> Drop for WorkerGuards<T> {
    fn drop(&mut self) {
        for guard in self.guards.drain(..) {
            guard.join().expect("worker panic");
        }
    }
}

/// Extracts a human-readable message from a panic payload, if it carries one.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
