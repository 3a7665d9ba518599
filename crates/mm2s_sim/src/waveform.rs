//! Value-change trace recording.
//!
//! The [`WaveformRecorder`] trait abstracts the trace sink. [`VcdRecorder`]
//! implements the IEEE 1364 Value Change Dump (VCD) format, producing text
//! that can be viewed in GTKWave, Surfer, or other waveform viewers, either
//! plain or gzip-compressed. [`NullRecorder`] discards everything and is
//! used when tracing is disabled.
//!
//! Timestamps are always passed in explicitly; a recorder never asks the
//! engine what time it is.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::SimError;
use crate::time::SimTime;

/// Recorder-side identifier of a traced signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TraceId(u32);

impl TraceId {
    /// Creates a `TraceId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Trait for recording simulation waveforms.
pub trait WaveformRecorder {
    /// Registers a signal for recording under the given ID.
    fn register_signal(&mut self, id: TraceId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level) in the waveform.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given time.
    fn record_change(&mut self, time: SimTime, id: TraceId, value: u64) -> Result<(), SimError>;

    /// Pushes buffered output to the underlying sink.
    fn flush(&mut self) -> Result<(), SimError>;

    /// Finalizes the waveform output (flush, write trailer, etc.).
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// A byte sink a [`VcdRecorder`] can close cleanly.
///
/// `finish` runs once at finalization; compressed sinks write their trailer
/// there, plain sinks just flush.
pub trait TraceOutput: Write {
    /// Completes the output stream.
    fn finish(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl TraceOutput for Vec<u8> {}

impl<W: Write> TraceOutput for BufWriter<W> {}

impl<W: Write> TraceOutput for GzEncoder<W> {
    fn finish(&mut self) -> io::Result<()> {
        self.try_finish()?;
        self.get_mut().flush()
    }
}

/// VCD (Value Change Dump) format recorder following IEEE 1364.
///
/// Signal identifiers use printable ASCII characters starting from `!` (0x21).
pub struct VcdRecorder<W: TraceOutput> {
    writer: W,
    /// Indexed by `TraceId`: (id_code, width).
    id_map: Vec<Option<(String, u32)>>,
    next_code: u32,
    header_written: bool,
    current_time: Option<SimTime>,
    finalized: bool,
}

impl<W: TraceOutput> VcdRecorder<W> {
    /// Creates a new VCD recorder writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            id_map: Vec::new(),
            next_code: 0,
            header_written: false,
            current_time: None,
            finalized: false,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  mm2s bus-functional harness")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1ns")?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    /// Generates a VCD identifier code from a sequential index.
    ///
    /// Multi-character codes are generated for indices >= 94.
    fn make_id_code(index: u32) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            let c = (b'!' + (idx % 94) as u8) as char;
            result.push(c);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    /// Formats a raw value as a VCD value string.
    fn format_value(value: u64, width: u32) -> String {
        if width == 1 {
            let bit = if value & 1 == 0 { "0" } else { "1" };
            bit.to_string()
        } else {
            let mut s = String::with_capacity(width as usize + 1);
            s.push('b');
            for i in (0..width).rev() {
                s.push(if (value >> i) & 1 == 0 { '0' } else { '1' });
            }
            s
        }
    }
}

impl<W: TraceOutput> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: TraceId, name: &str, width: u32) -> Result<(), SimError> {
        self.write_header()?;
        let id_code = Self::make_id_code(self.next_code);
        self.next_code += 1;

        writeln!(self.writer, "$var wire {width} {id_code} {name} $end")?;

        let index = id.as_raw() as usize;
        if self.id_map.len() <= index {
            self.id_map.resize(index + 1, None);
        }
        self.id_map[index] = Some((id_code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.write_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, time: SimTime, id: TraceId, value: u64) -> Result<(), SimError> {
        self.write_header()?;

        if self.current_time != Some(time) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{}", time.steps)?;
            self.current_time = Some(time);
        }

        let (id_code, width) = self
            .id_map
            .get(id.as_raw() as usize)
            .and_then(|entry| entry.as_ref())
            .ok_or(SimError::UnknownTraceSignal { index: id.as_raw() })?;

        let val_str = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{val_str}{id_code}")?;
        } else {
            writeln!(self.writer, "{val_str} {id_code}")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        if self.current_time.is_none() {
            self.write_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.finish()?;
        Ok(())
    }
}

/// A recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl WaveformRecorder for NullRecorder {
    fn register_signal(&mut self, _: TraceId, _: &str, _: u32) -> Result<(), SimError> {
        Ok(())
    }

    fn begin_scope(&mut self, _: &str) -> Result<(), SimError> {
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        Ok(())
    }

    fn record_change(&mut self, _: SimTime, _: TraceId, _: u64) -> Result<(), SimError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

/// Opens a VCD trace file at `path`, gzip-compressed when `compress` is set.
///
/// Missing parent directories are created.
pub fn open_vcd(path: &Path, compress: bool) -> Result<Box<dyn WaveformRecorder>, SimError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = BufWriter::new(File::create(path)?);
    let recorder: Box<dyn WaveformRecorder> = if compress {
        Box::new(VcdRecorder::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(VcdRecorder::new(file))
    };
    Ok(recorder)
}
