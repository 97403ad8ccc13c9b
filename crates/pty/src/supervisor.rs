// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The PTY Supervisor (§4.2): spawns child processes under a pseudo-terminal,
//! captures merged stdout+stderr, enforces slot limits, and recovers orphans
//! across restarts.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use gsdh_core::clock::Clock;
use gsdh_core::event::{Event, EventPublisher, RecoveredSession, WaitKind};
use gsdh_core::output::{OutputChunk, RingBuffer, StreamTag, MAX_BUFFER_BYTES_DEFAULT};
use gsdh_core::session::{Session, SessionId, SessionStatus, SlotId, N_SLOTS_DEFAULT};
use gsdh_protocol_dir::types::SessionStatusFile;
use gsdh_protocol_dir::ProtocolDir;
use gsdh_storage::Store;
use parking_lot::Mutex;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tokio::sync::mpsc;

use crate::error::PtyError;
use crate::session::LiveSession;
use crate::wait_detector::{self, DetectedWait};

/// Default unresponsive-session timeout (`SESSION_TIMEOUT`).
pub const SESSION_TIMEOUT_MILLIS_DEFAULT: i64 = 10 * 60 * 1000;

enum StreamEvent {
    Chunk(Vec<u8>),
    Closed,
}

/// Mirror a session's status into the Protocol Directory under its working
/// directory (§4.5). Best-effort: the Durable Store is authoritative, so a
/// failed write here is logged and swallowed rather than surfaced.
fn mirror_session_status(clock: &dyn Clock, working_dir: &str, session_id: &SessionId, state: &str) {
    let mirror = ProtocolDir::new(working_dir);
    let file = SessionStatusFile {
        session: session_id.as_str().to_string(),
        timestamp: clock.now_millis(),
        state: state.to_string(),
        phase: None,
        plan: None,
        current_task: None,
        total_tasks: None,
        task_name: None,
        message: None,
    };
    if let Err(err) = mirror.write_session_status(session_id.as_str(), &file) {
        tracing::warn!(session = %session_id, error = %err, "failed to mirror session status");
    }
}

pub struct PtySupervisor {
    store: Arc<Store>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    n_slots: u32,
    live: Mutex<HashMap<SessionId, Arc<LiveSession>>>,
    slot_owner: Mutex<HashMap<u32, SessionId>>,
}

impl PtySupervisor {
    pub fn new(store: Arc<Store>, events: Arc<dyn EventPublisher>, clock: Arc<dyn Clock>) -> Self {
        Self::with_slots(store, events, clock, N_SLOTS_DEFAULT)
    }

    pub fn with_slots(
        store: Arc<Store>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        n_slots: u32,
    ) -> Self {
        Self { store, events, clock, n_slots, live: Mutex::new(HashMap::new()), slot_owner: Mutex::new(HashMap::new()) }
    }

    fn claim_free_slot(&self, session: SessionId) -> Option<SlotId> {
        let mut owner = self.slot_owner.lock();
        for slot in 1..=self.n_slots {
            if !owner.contains_key(&slot) {
                owner.insert(slot, session);
                return Some(SlotId(slot));
            }
        }
        None
    }

    fn release_slot(&self, slot: SlotId) {
        self.slot_owner.lock().remove(&slot.0);
    }

    /// Spawn a new session under a pseudo-terminal. Returns the created
    /// session row, already persisted with `status = running`.
    pub fn spawn(&self, working_dir: &str, command: &str) -> Result<Session, PtyError> {
        let now = self.clock.now_millis();
        let session_id = SessionId::new();
        let slot = self
            .claim_free_slot(session_id)
            .ok_or(PtyError::SlotFull(self.n_slots))?;

        let pty_system = native_pty_system();
        let pair = match pty_system.openpty(PtySize { rows: 24, cols: 80, pixel_width: 0, pixel_height: 0 }) {
            Ok(pair) => pair,
            Err(err) => {
                self.release_slot(slot);
                return Err(PtyError::SpawnFailed(err.to_string()));
            }
        };

        let mut cmd = CommandBuilder::new("/bin/sh");
        cmd.arg("-c");
        cmd.arg(command);
        cmd.cwd(working_dir);

        let child = match pair.slave.spawn_command(cmd) {
            Ok(child) => child,
            Err(err) => {
                self.release_slot(slot);
                return Err(PtyError::SpawnFailed(err.to_string()));
            }
        };
        drop(pair.slave);

        let pid = child.process_id();
        let mut reader = match pair.master.try_clone_reader() {
            Ok(reader) => reader,
            Err(err) => {
                self.release_slot(slot);
                return Err(PtyError::SpawnFailed(err.to_string()));
            }
        };
        let writer = match pair.master.take_writer() {
            Ok(writer) => writer,
            Err(err) => {
                self.release_slot(slot);
                return Err(PtyError::SpawnFailed(err.to_string()));
            }
        };

        let mut session = Session::new(slot, working_dir, command, now);
        session.id = session_id;
        session.status = SessionStatus::Running;
        session.pid = pid;
        self.store.insert_session(&session)?;
        mirror_session_status(self.clock.as_ref(), working_dir, &session.id, "running");

        let live = Arc::new(LiveSession {
            master: pair.master,
            writer: Mutex::new(writer),
            child: Arc::new(Mutex::new(child)),
            ring: Mutex::new(RingBuffer::new(MAX_BUFFER_BYTES_DEFAULT)),
        });
        self.live.lock().insert(session.id, live.clone());

        self.events.publish(Event::SessionStarted { session: session.id, slot: session.slot, at: now });

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx.send(StreamEvent::Closed);
                        break;
                    }
                    Ok(n) => {
                        if tx.send(StreamEvent::Chunk(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        let _ = tx.send(StreamEvent::Closed);
                        break;
                    }
                }
            }
        });

        let store = self.store.clone();
        let events = self.events.clone();
        let clock = self.clock.clone();
        let session_id = session.id;
        let child_handle = live.child.clone();
        let live_ring = live.clone();
        tokio::spawn(Self::pump_output(rx, store, events, clock, session_id, live_ring, child_handle));

        Ok(session)
    }

    async fn pump_output(
        mut rx: mpsc::UnboundedReceiver<StreamEvent>,
        store: Arc<Store>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        session_id: SessionId,
        live: Arc<LiveSession>,
        child: Arc<Mutex<Box<dyn portable_pty::Child + Send + Sync>>>,
    ) {
        while let Some(ev) = rx.recv().await {
            match ev {
                StreamEvent::Chunk(bytes) => {
                    let at = clock.now_millis();
                    let chunk = OutputChunk::new(session_id, at, StreamTag::Stdout, bytes.clone());
                    if let Err(err) = store.append_output(&chunk) {
                        tracing::error!(session = %session_id, error = %err, "failed to persist output chunk");
                    }
                    live.ring.lock().push(&bytes);
                    events.publish(Event::SessionOutput { session: session_id, data: chunk.as_str_lossy().into_owned(), at });

                    let tail_lines = live.ring.lock().tail_lines(20);
                    if let DetectedWait::Waiting { kind, option_count, trigger_snippet, intent: _ } =
                        wait_detector::detect(&tail_lines)
                    {
                        Self::handle_waiting(&store, &events, clock.as_ref(), session_id, kind, option_count, trigger_snippet);
                    }
                }
                StreamEvent::Closed => break,
            }
        }

        let exit_code = tokio::task::spawn_blocking(move || {
            let mut child = child.lock();
            child.wait().ok().map(|status| status.exit_code() as i32)
        })
        .await
        .unwrap_or(None);

        let working_dir = store.get_session(&session_id).ok().flatten().map(|s| s.working_dir);
        let at = clock.now_millis();
        match exit_code {
            Some(0) => {
                if let Err(err) = store.update_session_status(&session_id, SessionStatus::Completed, None, Some(at)) {
                    tracing::error!(session = %session_id, error = %err, "failed to record completion");
                }
                if let Some(working_dir) = &working_dir {
                    mirror_session_status(clock.as_ref(), working_dir, &session_id, "completed");
                }
                events.publish(Event::SessionCompleted { session: session_id, exit_code: 0, at });
            }
            other => {
                let code = other.unwrap_or(-1);
                if let Err(err) = store.update_session_status(&session_id, SessionStatus::Failed, None, Some(at)) {
                    tracing::error!(session = %session_id, error = %err, "failed to record failure");
                }
                if let Some(working_dir) = &working_dir {
                    mirror_session_status(clock.as_ref(), working_dir, &session_id, "failed");
                }
                events.publish(Event::SessionFailed { session: session_id, reason: format!("exit code {code}"), at });
            }
        }
    }

    fn handle_waiting(
        store: &Store,
        events: &Arc<dyn EventPublisher>,
        clock: &dyn Clock,
        session_id: SessionId,
        kind: WaitKind,
        option_count: Option<u32>,
        trigger_snippet: String,
    ) {
        let at = clock.now_millis();
        events.publish(Event::SessionWaiting { session: session_id, kind, option_count, trigger_snippet, intent: None, at });

        // Only flip status when a response-required message is actually
        // outstanding; the wait detector is an optimization, not authority.
        // The session is still alive, so `pid` must survive this transition
        // (§3: `pid` is present exactly when status is running or
        // waiting_checkpoint) — unlike `update_session_status`, this leaves
        // pid and ended_at untouched.
        match store.get_pending(Some(&session_id)) {
            Ok(pending) if !pending.is_empty() => {
                if let Err(err) = store.set_session_status_only(&session_id, SessionStatus::WaitingCheckpoint) {
                    tracing::warn!(session = %session_id, error = %err, "failed to flip to waiting_checkpoint");
                } else if let Ok(Some(row)) = store.get_session(&session_id) {
                    mirror_session_status(clock, &row.working_dir, &session_id, "waiting_checkpoint");
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(session = %session_id, error = %err, "failed to check pending messages"),
        }
    }

    pub fn write_input(&self, session: &SessionId, bytes: &[u8]) -> Result<(), PtyError> {
        let live = self.live.lock().get(session).cloned().ok_or_else(|| PtyError::NotFound(session.clone()))?;
        live.write_input(bytes).map_err(|err| PtyError::WriteFailed(err.to_string()))
    }

    pub fn resize(&self, session: &SessionId, cols: u16, rows: u16) -> Result<(), PtyError> {
        let live = self.live.lock().get(session).cloned().ok_or_else(|| PtyError::NotFound(session.clone()))?;
        live.resize(cols, rows).map_err(PtyError::ResizeFailed)
    }

    pub fn end_session(&self, session: &SessionId) -> Result<(), PtyError> {
        let live = self.live.lock().remove(session).ok_or_else(|| PtyError::NotFound(session.clone()))?;
        let _ = live.kill();
        let session_row = self.store.get_session(session)?.ok_or_else(|| PtyError::NotFound(session.clone()))?;
        self.release_slot(session_row.slot);
        if session_row.status.is_terminal() {
            return Ok(());
        }
        self.store.update_session_status(session, SessionStatus::Failed, None, Some(self.clock.now_millis()))?;
        mirror_session_status(self.clock.as_ref(), &session_row.working_dir, session, "failed");
        self.events.publish(Event::SessionFailed {
            session: *session,
            reason: "terminated by client".to_string(),
            at: self.clock.now_millis(),
        });
        Ok(())
    }

    /// Sweep sessions un-polled for longer than `timeout_millis`, marking
    /// them `failed` and killing their child processes (§4.2, §5).
    pub fn sweep_timeouts(&self, timeout_millis: i64) -> Result<u32, PtyError> {
        let now = self.clock.now_millis();
        let mut swept = 0;
        for session in self.store.sessions_in_non_terminal_status()? {
            if now - session.last_polled_at >= timeout_millis {
                if let Some(live) = self.live.lock().remove(&session.id) {
                    let _ = live.kill();
                }
                self.release_slot(session.slot);
                self.store.update_session_status(&session.id, SessionStatus::Failed, None, Some(now))?;
                mirror_session_status(self.clock.as_ref(), &session.working_dir, &session.id, "failed");
                self.events.publish(Event::SessionFailed {
                    session: session.id,
                    reason: "session timeout".to_string(),
                    at: now,
                });
                swept += 1;
            }
        }
        Ok(swept)
    }

    pub fn touch_poll(&self, session: &SessionId) -> Result<(), PtyError> {
        self.store.touch_last_polled(session, self.clock.now_millis()).map_err(PtyError::from)
    }

    /// Recovery on startup (§4.2): signal any session left non-terminal by a
    /// prior harness instance, then mark it `failed` with an orphan
    /// annotation. The supervisor cannot reattach to the original PTY.
    pub fn recover_orphans(&self) -> Result<u32, PtyError> {
        let now = self.clock.now_millis();
        let mut recovered = Vec::new();
        for session in self.store.sessions_in_non_terminal_status()? {
            if let Some(pid) = session.pid {
                signal_if_alive(pid);
            }
            self.release_slot(session.slot);
            self.store.mark_session_orphaned_failed(&session.id, now)?;
            mirror_session_status(self.clock.as_ref(), &session.working_dir, &session.id, "failed");
            recovered.push(RecoveredSession { session: session.id, prior_pid: session.pid });
        }
        let orphaned = recovered.len() as u32;
        self.events.publish(Event::RecoveryComplete { orphaned_count: orphaned, recovered, at: now });
        Ok(orphaned)
    }
}

#[cfg(unix)]
fn signal_if_alive(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);
    if kill(nix_pid, None).is_ok() {
        let _ = kill(nix_pid, Signal::SIGTERM);
    }
}

#[cfg(not(unix))]
fn signal_if_alive(_pid: u32) {}
