use std::path::Path;
use std::time::{Duration, Instant};

/// Outcome of waiting for an output file to stop changing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settle {
    /// Two consecutive checks saw the same size (`None` if the file is absent)
    Stable(Option<u64>),
    /// The file was still changing when the timeout elapsed
    TimedOut(Option<u64>),
}

/// Poll `path` until its size is unchanged across two consecutive checks
pub(crate) fn wait_for_stable_size(path: &Path, poll_interval: Duration, timeout: Duration) -> Settle {
    let deadline = Instant::now() + timeout;
    let mut previous = observe(path);

    loop {
        if Instant::now() >= deadline {
            return Settle::TimedOut(previous);
        }

        std::thread::sleep(poll_interval);

        let current = observe(path);
        if current == previous {
            return Settle::Stable(current);
        }

        tracing::trace!(path = %path.display(), ?previous, ?current, "output still changing");
        previous = current;
    }
}

fn observe(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|metadata| metadata.len())
}
