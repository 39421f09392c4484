use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use bytes::Bytes;
use ferrumq_error::{ensure, FerrumResult, QueueError};
use parking_lot::Mutex;

use super::{BackendQueue, QueueLogger};
use crate::{config::LogLevel, fsutil};

/// Size of the big-endian length prefix in front of every record.
const RECORD_HEADER_LEN: u64 = 4;

/// File-backed FIFO queue.
///
/// Records are appended to numbered segment files
/// (`<name>.diskqueue.<NNNNNN>.dat`), each record being a big-endian `u32`
/// length followed by the payload. A segment is closed once it reaches
/// `max_bytes_per_file` and fully read segments are removed. Depth and the
/// read/write positions live in `<name>.diskqueue.meta.dat`, rewritten
/// atomically on every sync.
pub struct DiskQueue {
    name: String,
    data_path: PathBuf,
    max_bytes_per_file: u64,
    min_msg_size: u64,
    max_msg_size: u64,
    sync_every: u64,
    sync_timeout: Duration,
    logger: QueueLogger,
    state: Mutex<QueueState>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Positions {
    depth: u64,
    read_file_num: u64,
    read_pos: u64,
    write_file_num: u64,
    write_pos: u64,
}

struct QueueState {
    pos: Positions,
    reader: Option<File>,
    writer: Option<File>,
    writes_since_sync: u64,
    last_sync: Instant,
    closed: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl DiskQueue {
    /// Opens the queue `name` stored under `data_path`.
    ///
    /// Never fails: positions that cannot be read are logged and the queue
    /// starts empty. Segment files are opened lazily on first use.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        data_path: impl Into<PathBuf>,
        max_bytes_per_file: u64,
        min_msg_size: u64,
        max_msg_size: u64,
        sync_every: u64,
        sync_timeout: Duration,
        logger: QueueLogger,
    ) -> Self {
        let queue = Self {
            name: name.to_string(),
            data_path: data_path.into(),
            max_bytes_per_file,
            min_msg_size,
            // Lengths are stored in a u32 header.
            max_msg_size: max_msg_size.min(u64::from(u32::MAX)),
            sync_every: sync_every.max(1),
            sync_timeout,
            logger,
            state: Mutex::new(QueueState {
                pos: Positions::default(),
                reader: None,
                writer: None,
                writes_since_sync: 0,
                last_sync: Instant::now(),
                closed: false,
            }),
        };

        match queue.retrieve_positions() {
            Ok(Some(pos)) => queue.state.lock().pos = pos,
            Ok(None) => {}
            Err(e) => queue.logger.log(
                LogLevel::Error,
                format_args!("DISKQUEUE({}) failed to retrieve metadata - {e}", queue.name),
            ),
        }

        queue
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn segment_path(
        &self,
        file_num: u64,
    ) -> PathBuf {
        self.data_path
            .join(format!("{}.diskqueue.{:06}.dat", self.name, file_num))
    }

    fn meta_path(&self) -> PathBuf {
        self.data_path
            .join(format!("{}.diskqueue.meta.dat", self.name))
    }

    fn io_error(
        &self,
        context: &str,
        err: io::Error,
    ) -> QueueError {
        QueueError::Io {
            name: self.name.clone(),
            reason: format!("{context}: {err}"),
        }
    }

    fn ensure_open(
        &self,
        state: &QueueState,
    ) -> Result<(), QueueError> {
        if state.closed {
            return Err(QueueError::Closed {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Reads the position file: `depth\nread_file,read_pos\nwrite_file,write_pos\n`.
    fn retrieve_positions(&self) -> Result<Option<Positions>, QueueError> {
        let Some(raw) = fsutil::read_or_empty(&self.meta_path())
            .map_err(|e| self.io_error("reading metadata", e))?
        else {
            return Ok(None);
        };

        let corrupted = |reason: &str| QueueError::Corrupted {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        let text = String::from_utf8(raw).map_err(|_| corrupted("metadata is not UTF-8"))?;
        let mut lines = text.lines();

        let depth = lines
            .next()
            .and_then(|l| l.trim().parse().ok())
            .ok_or_else(|| corrupted("bad depth line"))?;
        let (read_file_num, read_pos) = lines
            .next()
            .and_then(parse_pair)
            .ok_or_else(|| corrupted("bad read position line"))?;
        let (write_file_num, write_pos) = lines
            .next()
            .and_then(parse_pair)
            .ok_or_else(|| corrupted("bad write position line"))?;

        Ok(Some(Positions {
            depth,
            read_file_num,
            read_pos,
            write_file_num,
            write_pos,
        }))
    }

    fn persist_positions(
        &self,
        pos: &Positions,
    ) -> Result<(), QueueError> {
        let body = format!(
            "{}\n{},{}\n{},{}\n",
            pos.depth, pos.read_file_num, pos.read_pos, pos.write_file_num, pos.write_pos
        );
        fsutil::atomic_write(&self.meta_path(), body.as_bytes())
            .map_err(|e| self.io_error("writing metadata", e))
    }

    /// fsyncs the current segment and persists the positions.
    fn sync(
        &self,
        state: &mut QueueState,
    ) -> Result<(), QueueError> {
        if let Some(writer) = state.writer.as_mut() {
            writer
                .sync_all()
                .map_err(|e| self.io_error("syncing segment", e))?;
        }
        self.persist_positions(&state.pos)?;
        state.writes_since_sync = 0;
        state.last_sync = Instant::now();
        Ok(())
    }

    fn open_writer(
        &self,
        state: &mut QueueState,
    ) -> Result<(), QueueError> {
        if state.writer.is_some() {
            return Ok(());
        }
        let path = self.segment_path(state.pos.write_file_num);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| self.io_error("opening segment for writing", e))?;
        // Bytes past the persisted write position were never acknowledged.
        file.set_len(state.pos.write_pos)
            .and_then(|_| file.seek(SeekFrom::Start(state.pos.write_pos)))
            .map_err(|e| self.io_error("positioning segment writer", e))?;

        self.logger.log(
            LogLevel::Debug,
            format_args!("DISKQUEUE({}): writing to {}", self.name, path.display()),
        );
        state.writer = Some(file);
        Ok(())
    }

    fn open_reader(
        &self,
        state: &mut QueueState,
    ) -> Result<(), QueueError> {
        if state.reader.is_some() {
            return Ok(());
        }
        let path = self.segment_path(state.pos.read_file_num);
        let mut file =
            File::open(&path).map_err(|e| self.io_error("opening segment for reading", e))?;
        file.seek(SeekFrom::Start(state.pos.read_pos))
            .map_err(|e| self.io_error("positioning segment reader", e))?;
        state.reader = Some(file);
        Ok(())
    }

    /// Moves the reader past a finished segment and removes it.
    fn advance_read_segment(
        &self,
        state: &mut QueueState,
    ) {
        let finished = self.segment_path(state.pos.read_file_num);
        state.reader = None;
        state.pos.read_file_num += 1;
        state.pos.read_pos = 0;

        if let Err(e) = fs::remove_file(&finished) {
            self.logger.log(
                LogLevel::Error,
                format_args!(
                    "DISKQUEUE({}) failed to remove {} - {e}",
                    self.name,
                    finished.display()
                ),
            );
        }
    }

    /// Sets a corrupted segment aside and resumes at the next one.
    fn skip_corrupted_segment(
        &self,
        state: &mut QueueState,
        reason: String,
    ) -> QueueError {
        let bad = self.segment_path(state.pos.read_file_num);
        let mut renamed = bad.clone().into_os_string();
        renamed.push(".bad");

        self.logger.log(
            LogLevel::Error,
            format_args!(
                "DISKQUEUE({}) jump to next file and saving bad file as {} - {reason}",
                self.name,
                Path::new(&renamed).display()
            ),
        );
        if let Err(e) = fs::rename(&bad, &renamed) {
            self.logger.log(
                LogLevel::Error,
                format_args!("DISKQUEUE({}) failed to rename bad file - {e}", self.name),
            );
        }

        if state.pos.read_file_num == state.pos.write_file_num {
            state.writer = None;
            state.pos.write_file_num += 1;
            state.pos.write_pos = 0;
        }
        state.reader = None;
        state.pos.read_file_num += 1;
        state.pos.read_pos = 0;
        if state.pos.read_file_num == state.pos.write_file_num {
            state.pos.depth = 0;
        }

        QueueError::Corrupted {
            name: self.name.clone(),
            reason,
        }
    }

    fn read_record(
        &self,
        state: &mut QueueState,
    ) -> Result<Vec<u8>, QueueError> {
        self.open_reader(state)?;
        let Some(reader) = state.reader.as_mut() else {
            return Err(self.io_error(
                "reading segment",
                io::Error::other("reader unavailable"),
            ));
        };

        let mut header = [0u8; RECORD_HEADER_LEN as usize];
        if let Err(e) = reader.read_exact(&mut header) {
            return Err(self.skip_corrupted_segment(state, format!("truncated header: {e}")));
        }
        let len = u64::from(u32::from_be_bytes(header));
        if len < self.min_msg_size || len > self.max_msg_size {
            return Err(self.skip_corrupted_segment(state, format!("invalid record size {len}")));
        }

        let mut payload = vec![0u8; len as usize];
        if let Err(e) = reader.read_exact(&mut payload) {
            return Err(self.skip_corrupted_segment(state, format!("truncated payload: {e}")));
        }

        state.pos.read_pos += RECORD_HEADER_LEN + len;
        state.pos.depth = state.pos.depth.saturating_sub(1);
        Ok(payload)
    }

    /// A segment behind the write segment is complete; the reader is done
    /// with it once the read position reaches its size.
    fn segment_exhausted(state: &QueueState) -> bool {
        if state.pos.read_file_num >= state.pos.write_file_num {
            return false;
        }
        match state.reader.as_ref().map(File::metadata) {
            Some(Ok(meta)) => state.pos.read_pos >= meta.len(),
            _ => false,
        }
    }
}

fn parse_pair(line: &str) -> Option<(u64, u64)> {
    let (a, b) = line.trim().split_once(',')?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

////////////////////////////////////////////////////////////////////////////////
// BackendQueue implementation
////////////////////////////////////////////////////////////////////////////////

impl BackendQueue for DiskQueue {
    fn put(
        &self,
        data: &[u8],
    ) -> FerrumResult<()> {
        let mut state = self.state.lock();
        self.ensure_open(&state)?;

        let len = data.len() as u64;
        ensure!(
            (self.min_msg_size..=self.max_msg_size).contains(&len),
            QueueError::InvalidMessageSize {
                name: self.name.clone(),
                size: len,
                min: self.min_msg_size,
                max: self.max_msg_size,
            }
        );

        self.open_writer(&mut state)?;
        let mut record = Vec::with_capacity(RECORD_HEADER_LEN as usize + data.len());
        record.extend_from_slice(&(len as u32).to_be_bytes());
        record.extend_from_slice(data);

        if let Some(writer) = state.writer.as_mut() {
            writer
                .write_all(&record)
                .map_err(|e| self.io_error("appending record", e))?;
        }
        state.pos.write_pos += record.len() as u64;
        state.pos.depth += 1;
        state.writes_since_sync += 1;

        if state.pos.write_pos >= self.max_bytes_per_file {
            // Roll: make the finished segment durable before moving on.
            self.sync(&mut state)?;
            state.writer = None;
            state.pos.write_file_num += 1;
            state.pos.write_pos = 0;
            self.persist_positions(&state.pos)?;
        } else if state.writes_since_sync >= self.sync_every
            || state.last_sync.elapsed() >= self.sync_timeout
        {
            self.sync(&mut state)?;
        }

        Ok(())
    }

    fn read_next(&self) -> FerrumResult<Option<Bytes>> {
        let mut state = self.state.lock();
        self.ensure_open(&state)?;

        loop {
            let pos = state.pos;
            if pos.read_file_num == pos.write_file_num && pos.read_pos >= pos.write_pos {
                return Ok(None);
            }

            if let Err(e) = self.open_reader(&mut state) {
                if pos.read_file_num < pos.write_file_num {
                    return Err(self.skip_corrupted_segment(&mut state, e.to_string()).into());
                }
                return Err(e.into());
            }
            if Self::segment_exhausted(&state) {
                self.advance_read_segment(&mut state);
                continue;
            }

            let payload = self.read_record(&mut state)?;
            if Self::segment_exhausted(&state) {
                self.advance_read_segment(&mut state);
            }
            return Ok(Some(Bytes::from(payload)));
        }
    }

    fn depth(&self) -> u64 {
        self.state.lock().pos.depth
    }

    fn close(&self) -> FerrumResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        self.logger.log(
            LogLevel::Info,
            format_args!("DISKQUEUE({}): closing", self.name),
        );
        state.closed = true;
        let result = self.sync(&mut state);
        state.reader = None;
        state.writer = None;
        result.map_err(Into::into)
    }

    fn delete(&self) -> FerrumResult<()> {
        let mut state = self.state.lock();
        self.logger.log(
            LogLevel::Info,
            format_args!("DISKQUEUE({}): deleting", self.name),
        );
        state.closed = true;
        state.reader = None;
        state.writer = None;
        Ok(())
    }

    fn empty(&self) -> FerrumResult<()> {
        let mut state = self.state.lock();
        self.ensure_open(&state)?;
        self.logger.log(
            LogLevel::Info,
            format_args!("DISKQUEUE({}): emptying", self.name),
        );

        state.reader = None;
        state.writer = None;
        for file_num in state.pos.read_file_num..=state.pos.write_file_num {
            let path = self.segment_path(file_num);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    self.logger.log(
                        LogLevel::Error,
                        format_args!(
                            "DISKQUEUE({}) failed to remove {} - {e}",
                            self.name,
                            path.display()
                        ),
                    );
                }
            }
        }

        let next = state.pos.write_file_num + 1;
        state.pos = Positions {
            depth: 0,
            read_file_num: next,
            read_pos: 0,
            write_file_num: next,
            write_pos: 0,
        };

        match fs::remove_file(self.meta_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("removing metadata", e).into()),
        }
    }
}

impl std::fmt::Debug for DiskQueue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DiskQueue")
            .field("name", &self.name)
            .field("data_path", &self.data_path)
            .field("positions", &self.state.lock().pos)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
