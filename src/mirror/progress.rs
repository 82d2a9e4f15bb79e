//! mirror::progress
//!
//! Progress reporting seam for mirror batches. The default sink logs
//! through `tracing`; richer front ends (spinners, TTY progress) plug in
//! here without the mirror knowing about them.

use tracing::{debug, info};

/// Receives batch and per-checkout progress events.
pub trait MirrorProgress: Send + Sync {
    fn batch_started(&self, checkouts: usize);
    fn checkout_started(&self, name: &str);
    fn checkout_pushed(&self, name: &str);
    fn batch_finished(&self);
}

/// Log-backed progress sink.
#[derive(Debug, Default)]
pub struct LogProgress;

impl MirrorProgress for LogProgress {
    fn batch_started(&self, checkouts: usize) {
        info!("processing {checkouts} git checkout(s)");
    }

    fn checkout_started(&self, name: &str) {
        info!("pushing git checkout {name}");
    }

    fn checkout_pushed(&self, name: &str) {
        debug!("pushed git checkout {name}");
    }

    fn batch_finished(&self) {
        info!("all git checkouts pushed");
    }
}
