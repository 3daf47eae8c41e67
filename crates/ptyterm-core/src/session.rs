//! A running child process viewed as a stream of text lines.
//!
//! [`SessionController`] spawns a command through a [`Transport`], runs a
//! reader thread that feeds the output through an [`OutputScanner`] into a
//! [`LineBuffer`], and encodes keys and pastes on the way in. Observers get
//! payload-free change notifications and pull the state they need.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use async_channel::Receiver;
use ptyterm_ansi::{CsiSequence, LineBuffer, LineSink, OutputScanner, ScannerStats};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::constants::{
    DIAGNOSTIC_PREFIX, EXIT_POLL_ATTEMPTS, EXIT_POLL_INTERVAL_MS, MAX_CONSECUTIVE_READ_ERRORS,
    READ_RETRY_DELAY_MS,
};
use crate::encoder::{KeyEncoder, KeyEncoderConfig};
use crate::error::{TerminalError, TerminalResult};
use crate::key::KeyEvent;
use crate::modes::ModeTracker;
use crate::notify::{ChangeNotifier, ListenerId};
use crate::security::{bracket_paste, is_paste_safe};
use crate::transport::{self, bytes_from_values, Transport, TransportFactory, TransportReader, TransportWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    NotStarted,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Output,
    Error,
}

/// Everything the reader threads and the API share, behind one mutex.
struct SessionInner {
    state: SessionState,
    // bumped by every start and stop; readers of older runs back off
    generation: u64,
    transport: Option<Box<dyn Transport>>,
    input: Option<Arc<InputChannel>>,
    scanner: OutputScanner,
    error_scanner: OutputScanner,
    buffer: LineBuffer,
    encoder: KeyEncoder,
    modes: ModeTracker,
    track_modes: bool,
    exit_code: Option<i32>,
    child_pid: Option<u32>,
    size: (u16, u16),
}

/// Write side of a run. Writes may block on a child that is not reading,
/// so they go through here without the session lock held.
struct InputChannel {
    writer: Mutex<TransportWriter>,
    // terminal query replies waiting for the writer
    replies: Mutex<Vec<u8>>,
}

impl InputChannel {
    fn new(writer: TransportWriter) -> Self {
        Self {
            writer: Mutex::new(writer),
            replies: Mutex::new(Vec::new()),
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            writer.write_all(bytes)?;
            writer.flush()?;
        }
        self.send_replies();
        Ok(())
    }

    /// Queue `reply` for the child. It goes out now if the writer is free,
    /// otherwise right after the write in progress.
    fn reply(&self, reply: &[u8]) {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(reply);
        self.send_replies();
    }

    // whoever releases the writer calls this again, so nothing is stranded
    fn send_replies(&self) {
        loop {
            {
                let mut writer = match self.writer.try_lock() {
                    Ok(writer) => writer,
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                    Err(TryLockError::WouldBlock) => return,
                };
                let pending = std::mem::take(&mut *self.replies.lock().unwrap_or_else(PoisonError::into_inner));
                if !pending.is_empty() {
                    debug!("Answering terminal query with {} bytes", pending.len());
                    if let Err(e) = writer.write_all(&pending).and_then(|()| writer.flush()) {
                        warn!("Failed to answer terminal query: {}", e);
                        return;
                    }
                }
            }
            // a reply queued while we held the writer found it busy
            if self.replies.lock().unwrap_or_else(PoisonError::into_inner).is_empty() {
                return;
            }
        }
    }
}

/// Routes scanner output into the buffer and, for the main stream, the
/// mode tracker.
struct SessionSink<'a> {
    buffer: &'a mut LineBuffer,
    tracker: Option<(&'a mut ModeTracker, &'a mut KeyEncoder)>,
    replies: &'a mut Vec<u8>,
}

impl LineSink for SessionSink<'_> {
    fn push_str(&mut self, text: &str) {
        self.buffer.ingest(text);
    }

    fn set_title(&mut self, title: &str) {
        self.buffer.set_title(title);
    }

    fn csi(&mut self, sequence: &CsiSequence) {
        if let Some((modes, encoder)) = self.tracker.as_mut() {
            if let Some(reply) = modes.apply(sequence, encoder) {
                self.replies.extend_from_slice(&reply);
            }
        }
    }
}

fn new_scanner() -> OutputScanner {
    OutputScanner::new().with_error_callback(|err| debug!("Malformed output sequence: {}", err))
}

impl SessionInner {
    /// Run `f` against the scanner for `stream`. Returns the replies owed
    /// to terminal queries seen along the way.
    fn with_sink<F>(&mut self, stream: Stream, f: F) -> Vec<u8>
    where
        F: FnOnce(&mut OutputScanner, &mut SessionSink<'_>),
    {
        let mut replies = Vec::new();
        let SessionInner {
            scanner,
            error_scanner,
            buffer,
            encoder,
            modes,
            track_modes,
            ..
        } = self;
        let scanner = match stream {
            Stream::Output => scanner,
            Stream::Error => error_scanner,
        };
        let tracker = if *track_modes && stream == Stream::Output {
            Some((modes, encoder))
        } else {
            None
        };
        let mut sink = SessionSink {
            buffer,
            tracker,
            replies: &mut replies,
        };
        f(scanner, &mut sink);
        replies
    }

    fn ingest(&mut self, stream: Stream, bytes: &[u8]) -> Vec<u8> {
        self.with_sink(stream, |scanner, sink| scanner.feed(bytes, sink))
    }

    // the child is gone, so replies to a trailing query are dropped
    fn flush_scanners(&mut self) {
        self.with_sink(Stream::Output, |scanner, sink| scanner.flush(sink));
        self.with_sink(Stream::Error, |scanner, sink| scanner.flush(sink));
    }

    /// End the run: mark it stopped and hand back its handles.
    fn end_run(&mut self) -> (Option<Box<dyn Transport>>, u64) {
        self.generation += 1;
        self.state = SessionState::Stopped;
        self.input = None;
        (self.transport.take(), self.generation)
    }

    /// Append `[ptyterm] <message>` on a line of its own.
    fn append_diagnostic(&mut self, message: &str) {
        if !self.buffer.last().is_empty() {
            self.buffer.ingest("\n");
        }
        self.buffer.ingest(&format!("{DIAGNOSTIC_PREFIX} {message}\n"));
    }
}

fn lock_inner(shared: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    shared.lock().unwrap_or_else(|poisoned| {
        warn!("Session lock poisoned; recovering");
        PoisonError::into_inner(poisoned)
    })
}

/// The run's input channel, while a child is running.
fn running_input(inner: &SessionInner) -> Option<Arc<InputChannel>> {
    if inner.state != SessionState::Running {
        return None;
    }
    inner.input.clone()
}

/// Close a transport taken out of the session and keep its exit code if
/// the session is still on the same run.
fn release_transport(shared: &Mutex<SessionInner>, mut transport: Box<dyn Transport>, generation: u64) {
    transport.close();
    let code = transport.try_exit_code();
    let mut inner = lock_inner(shared);
    if inner.generation == generation && inner.exit_code.is_none() {
        inner.exit_code = code;
    }
}

pub struct SessionController {
    config: SessionConfig,
    inner: Arc<Mutex<SessionInner>>,
    notifier: Arc<ChangeNotifier>,
    factory: TransportFactory,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("command", &self.config.command.display())
            .field("transport", &self.config.transport)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Session using the transport chosen by `config.transport`.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_transport_factory(config, transport::default_factory())
    }

    /// Session whose transports come from `factory`, e.g. a remote channel
    /// or a test double.
    pub fn with_transport_factory(config: SessionConfig, factory: TransportFactory) -> Self {
        debug!(
            "Creating session for '{}' over {} ({}x{})",
            config.command.display(),
            config.transport,
            config.cols,
            config.rows
        );
        let inner = SessionInner {
            state: SessionState::NotStarted,
            generation: 0,
            transport: None,
            input: None,
            scanner: new_scanner(),
            error_scanner: new_scanner(),
            buffer: LineBuffer::new(config.max_lines),
            encoder: KeyEncoder::with_config(config.encoder.clone()),
            modes: ModeTracker::new(),
            track_modes: config.track_modes,
            exit_code: None,
            child_pid: None,
            size: (config.rows, config.cols),
        };
        Self {
            config,
            inner: Arc::new(Mutex::new(inner)),
            notifier: Arc::new(ChangeNotifier::new()),
            factory,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        lock_inner(&self.inner)
    }

    /// Spawn the configured command. Returns `true` when the session is
    /// running afterwards; failures are logged and written into the buffer
    /// as a diagnostic line.
    pub fn start(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == SessionState::Running {
            return true;
        }

        inner.generation += 1;
        let generation = inner.generation;
        inner.scanner.reset();
        inner.error_scanner.reset();
        let SessionInner { modes, encoder, .. } = &mut *inner;
        modes.reset(encoder);
        inner.exit_code = None;
        inner.child_pid = None;

        if let Err(e) = self.config.validate() {
            return self.fail_start(inner, e);
        }

        let command = &self.config.command;
        let (rows, cols) = inner.size;
        let spawned = (self.factory)(self.config.transport).and_then(|mut transport| {
            transport.spawn(command, rows, cols)?;
            Ok(transport)
        });
        let mut transport = match spawned {
            Ok(transport) => transport,
            Err(e) => return self.fail_start(inner, e),
        };

        let (reader, writer) = match (transport.take_reader(), transport.take_writer()) {
            (Some(reader), Some(writer)) => (reader, writer),
            _ => {
                transport.close();
                return self.fail_start(inner, TerminalError::TransportClosed);
            }
        };
        let error_reader = transport.take_error_reader();

        inner.child_pid = transport.child_pid();
        inner.transport = Some(transport);
        inner.input = Some(Arc::new(InputChannel::new(writer)));
        inner.state = SessionState::Running;

        let mut readers = vec![(Stream::Output, reader)];
        readers.extend(error_reader.map(|r| (Stream::Error, r)));
        for (stream, reader) in readers {
            if let Err(e) = self.spawn_reader(stream, reader, generation) {
                inner.input = None;
                if let Some(mut transport) = inner.transport.take() {
                    transport.close();
                }
                return self.fail_start(inner, e.into());
            }
        }

        info!("Session started: {} (pid {:?})", command.display(), inner.child_pid);
        drop(inner);
        self.notifier.notify();
        true
    }

    fn fail_start(&self, mut inner: MutexGuard<'_, SessionInner>, err: TerminalError) -> bool {
        let command = self.config.command.display();
        error!("Failed to start {}: {}", command, err);
        inner.state = SessionState::NotStarted;
        inner.generation += 1;
        inner.append_diagnostic(&format!("failed to start {command}: {err}"));
        drop(inner);
        self.notifier.notify();
        false
    }

    fn spawn_reader(&self, stream: Stream, reader: TransportReader, generation: u64) -> std::io::Result<()> {
        let shared = Arc::clone(&self.inner);
        let notifier = Arc::clone(&self.notifier);
        let buffer_size = self.config.read_buffer_size;
        let name = match stream {
            Stream::Output => "ptyterm-reader",
            Stream::Error => "ptyterm-stderr",
        };
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || read_loop(shared, notifier, reader, stream, generation, buffer_size))?;
        Ok(())
    }

    /// Kill the child and release the transport. Always leaves the session
    /// stopped; safe to call repeatedly or before `start`, and while a write
    /// is blocked on the child.
    pub fn stop(&self) {
        let (transport, generation, changed) = {
            let mut inner = self.lock();
            let changed = inner.state != SessionState::Stopped;
            let (transport, generation) = inner.end_run();
            (transport, generation, changed)
        };

        if let Some(mut transport) = transport {
            info!("Stopping session: {}", self.config.command.display());
            if let Err(e) = transport.kill() {
                debug!("Kill on stop: {}", e);
            }
            release_transport(&self.inner, transport, generation);
        }
        if changed {
            self.notifier.notify();
        }
    }

    /// Write `text`, optionally refusing text the paste classifier flags.
    pub fn write(&self, text: &str, sanitize_paste: bool) -> bool {
        if sanitize_paste && !is_paste_safe(text) {
            warn!("Refusing unsafe text of {} bytes", text.len());
            return false;
        }
        self.write_bytes(text.as_bytes())
    }

    /// Write raw bytes to the child. Blocks while the child is not reading
    /// its input; the rest of the session stays usable meanwhile.
    pub fn write_bytes(&self, bytes: &[u8]) -> bool {
        let input = {
            let inner = self.lock();
            running_input(&inner)
        };
        self.send_input(input, bytes)
    }

    /// Write integer byte values. Values outside 0–255 are rejected as a
    /// whole with [`TerminalError::ByteOutOfRange`].
    pub fn write_byte_values(&self, values: &[i64]) -> TerminalResult<bool> {
        let bytes = bytes_from_values(values)?;
        Ok(self.write_bytes(&bytes))
    }

    /// Encode `event` with the session's encoder and write the result. An
    /// event that encodes to nothing succeeds without writing.
    pub fn send_key(&self, event: &KeyEvent) -> bool {
        let (input, bytes) = {
            let inner = self.lock();
            (running_input(&inner), inner.encoder.encode(event))
        };
        self.send_input(input, &bytes)
    }

    /// Paste `text`: bracketed when the application enabled bracketed
    /// paste, otherwise only if the paste classifier accepts it.
    pub fn paste(&self, text: &str) -> bool {
        let (input, bracketed) = {
            let inner = self.lock();
            (running_input(&inner), inner.modes.bracketed_paste())
        };
        let bytes = if bracketed {
            bracket_paste(text).into_bytes()
        } else if is_paste_safe(text) {
            text.as_bytes().to_vec()
        } else {
            warn!("Refusing unsafe paste of {} bytes", text.len());
            return false;
        };
        self.send_input(input, &bytes)
    }

    // Runs without the session lock: the write may block on the child.
    fn send_input(&self, input: Option<Arc<InputChannel>>, bytes: &[u8]) -> bool {
        let input = match input {
            Some(input) => input,
            None => return false,
        };
        if bytes.is_empty() {
            return true;
        }
        let err = match input.write(bytes) {
            Ok(()) => return true,
            Err(e) => e,
        };

        let transport = {
            let mut inner = self.lock();
            // stop or child exit retired the channel while we were blocked
            if !inner.input.as_ref().is_some_and(|current| Arc::ptr_eq(current, &input)) {
                debug!("Write ended with the run: {}", err);
                return false;
            }
            error!("Write to child failed: {}", err);
            inner.append_diagnostic(&format!("write failed: {err}"));
            inner.end_run()
        };
        if let (Some(transport), generation) = transport {
            release_transport(&self.inner, transport, generation);
        }
        self.notifier.notify();
        false
    }

    /// Resize the terminal. Zero dimensions are rejected. When no child is
    /// running the size is kept for the next start and `false` returned.
    pub fn resize(&self, rows: u16, cols: u16) -> bool {
        if rows == 0 || cols == 0 {
            warn!("Ignoring resize to {}x{}", cols, rows);
            return false;
        }
        let mut inner = self.lock();
        inner.size = (rows, cols);
        match inner.transport.as_mut() {
            Some(transport) => match transport.resize(rows, cols) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to resize: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Terminal size as (rows, cols).
    pub fn size(&self) -> (u16, u16) {
        let inner = self.lock();
        match inner.transport.as_ref() {
            Some(transport) => transport.size(),
            None => inner.size,
        }
    }

    /// Exit code of the most recent run, once the child has exited.
    pub fn exit_code(&self) -> Option<i32> {
        let mut inner = self.lock();
        if inner.exit_code.is_none() {
            let code = inner.transport.as_mut().and_then(|t| t.try_exit_code());
            inner.exit_code = code;
        }
        inner.exit_code
    }

    pub fn child_pid(&self) -> Option<u32> {
        self.lock().child_pid
    }

    pub fn process_group_leader(&self) -> Option<i32> {
        self.lock().transport.as_ref().and_then(|t| t.process_group_leader())
    }

    /// Block until the session stops or `timeout` passes. Returns whether
    /// it stopped.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let ticks = self.subscribe();
        loop {
            if !self.is_running() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // ticks wake us early; the sleep bounds the wait if none come
            if ticks.try_recv().is_err() {
                thread::sleep((deadline - now).min(Duration::from_millis(EXIT_POLL_INTERVAL_MS)));
            }
        }
    }

    /// Block until the child exits and return its exit code.
    pub fn wait_exit(&self) -> TerminalResult<i32> {
        let ticks = self.subscribe();
        loop {
            match self.state() {
                SessionState::NotStarted => return Err(TerminalError::NotRunning),
                SessionState::Stopped => break,
                SessionState::Running => {}
            }
            if ticks.recv_blocking().is_err() {
                return Err(TerminalError::NotRunning);
            }
        }
        // a stop records the code just after the state flips
        for _ in 0..EXIT_POLL_ATTEMPTS {
            if let Some(code) = self.exit_code() {
                return Ok(code);
            }
            thread::sleep(Duration::from_millis(EXIT_POLL_INTERVAL_MS));
        }
        Err(TerminalError::NotRunning)
    }

    pub fn clear(&self) {
        self.lock().buffer.clear();
        self.notifier.notify();
    }

    pub fn lines(&self) -> Vec<String> {
        self.lock().buffer.to_vec()
    }

    pub fn text(&self) -> String {
        self.lock().buffer.text()
    }

    pub fn title(&self) -> String {
        self.lock().buffer.title().to_string()
    }

    pub fn revision(&self) -> u64 {
        self.lock().buffer.revision()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Whether the application has enabled bracketed paste.
    pub fn bracketed_paste(&self) -> bool {
        self.lock().modes.bracketed_paste()
    }

    pub fn scanner_stats(&self) -> ScannerStats {
        self.lock().scanner.stats().clone()
    }

    /// Run `f` with the session's encoder, e.g. to change its configuration.
    pub fn with_encoder<R>(&self, f: impl FnOnce(&mut KeyEncoder) -> R) -> R {
        f(&mut self.lock().encoder)
    }

    pub fn encoder_config(&self) -> KeyEncoderConfig {
        self.lock().encoder.config().clone()
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.notifier.remove_listener(id)
    }

    /// Channel receiving a tick after changes; ticks coalesce while unread.
    pub fn subscribe(&self) -> Receiver<()> {
        self.notifier.subscribe()
    }

    /// Stop the session and drop every listener and subscription.
    pub fn dispose(self) {
        self.stop();
        self.notifier.dispose();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let (transport, _) = self.lock().end_run();
        if let Some(mut transport) = transport {
            debug!("Closing transport of dropped session");
            transport.close();
        }
    }
}

fn read_loop(
    shared: Arc<Mutex<SessionInner>>,
    notifier: Arc<ChangeNotifier>,
    mut reader: TransportReader,
    stream: Stream,
    generation: u64,
    buffer_size: usize,
) {
    debug!("Reader thread starting ({:?}, run {})", stream, generation);
    let mut buf = vec![0u8; buffer_size];
    let mut consecutive_errors = 0;

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("Reader received EOF ({:?})", stream);
                break;
            }
            Ok(n) => {
                consecutive_errors = 0;
                let (replies, input) = {
                    let mut inner = lock_inner(&shared);
                    if inner.generation != generation {
                        debug!("Reader of a finished run exiting");
                        return;
                    }
                    let replies = inner.ingest(stream, &buf[..n]);
                    (replies, inner.input.clone())
                };
                if let Some(input) = input.filter(|_| !replies.is_empty()) {
                    input.reply(&replies);
                }
                notifier.notify();
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                // a PTY master reports EIO once the child is gone
                let exited = {
                    let mut inner = lock_inner(&shared);
                    if inner.generation != generation {
                        return;
                    }
                    inner.transport.as_mut().and_then(|t| t.try_exit_code()).is_some()
                };
                if exited {
                    debug!("Read error after child exit, treating as EOF: {}", e);
                    break;
                }

                consecutive_errors += 1;
                if consecutive_errors > MAX_CONSECUTIVE_READ_ERRORS {
                    error!("Read failed consecutively {} times, giving up: {}", consecutive_errors, e);
                    break;
                }
                warn!("Read error (attempt {}) - retrying: {}", consecutive_errors, e);
                thread::sleep(Duration::from_millis(READ_RETRY_DELAY_MS));
            }
        }
    }

    if stream == Stream::Output {
        finish_run(&shared, &notifier, generation);
    }
    debug!("Reader thread exiting ({:?})", stream);
}

/// Output ended: collect the exit code, stop the run and tell observers.
fn finish_run(shared: &Mutex<SessionInner>, notifier: &ChangeNotifier, generation: u64) {
    let mut code = None;
    for _ in 0..EXIT_POLL_ATTEMPTS {
        {
            let mut inner = lock_inner(shared);
            if inner.generation != generation {
                return;
            }
            code = inner.transport.as_mut().and_then(|t| t.try_exit_code());
        }
        if code.is_some() {
            break;
        }
        thread::sleep(Duration::from_millis(EXIT_POLL_INTERVAL_MS));
    }

    // stays Running until the exit code is recorded
    let transport = {
        let mut inner = lock_inner(shared);
        if inner.generation != generation {
            return;
        }
        inner.flush_scanners();
        inner.input = None;
        inner.transport.take()
    };
    if let Some(mut transport) = transport {
        transport.close();
        code = code.or_else(|| transport.try_exit_code());
    }

    {
        let mut inner = lock_inner(shared);
        if inner.generation != generation {
            return;
        }
        inner.state = SessionState::Stopped;
        inner.exit_code = code;
    }
    info!("Session ended with exit code {:?}", code);
    notifier.notify();
}
