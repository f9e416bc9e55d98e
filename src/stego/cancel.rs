// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Per-operation cancellation.
//!
//! Uses an atomic flag so a token can be fired from another thread while
//! the operation runs. Each token is independent; cancelling one operation
//! never affects another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::StegoError;

/// Cloneable handle; all clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The operation stops before its next step.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Return [`StegoError::Cancelled`] if cancellation has been requested.
    pub fn check(&self) -> Result<(), StegoError> {
        if self.is_cancelled() {
            Err(StegoError::Cancelled)
        } else {
            Ok(())
        }
    }
}
