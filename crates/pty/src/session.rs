// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One live PTY-backed child process, held by the supervisor for as long as
//! its session is non-terminal.

use std::io::Write;
use std::sync::Arc;

use gsdh_core::output::RingBuffer;
use parking_lot::Mutex;
use portable_pty::{Child, MasterPty};

pub struct LiveSession {
    pub master: Box<dyn MasterPty + Send>,
    pub writer: Mutex<Box<dyn Write + Send>>,
    pub child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    pub ring: Mutex<RingBuffer>,
}

impl LiveSession {
    pub fn write_input(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.lock().write_all(bytes)
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), String> {
        self.master
            .resize(portable_pty::PtySize { rows, cols, pixel_width: 0, pixel_height: 0 })
            .map_err(|e| e.to_string())
    }

    pub fn kill(&self) -> std::io::Result<()> {
        self.child.lock().kill()
    }
}
