//! Little-endian binary particle stream codec.
//!
//! Layout: f32 `particles_per_meter`, u32 `particle_count`, then
//! `particle_count` records of nine f32 values (position, half-step
//! velocity, velocity).

use glam::Vec3;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Error type for particle stream operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Underlying I/O fault, including truncated input.
    #[error("particle stream I/O error: {0}")]
    Io(#[from] io::Error),
    /// Structurally valid read with physically meaningless header values.
    #[error("invalid particle stream header: {0}")]
    InvalidHeader(String),
}

/// Reader over the binary particle format.
pub struct SimulationReader<R: Read> {
    inner: R,
}

impl SimulationReader<BufReader<File>> {
    /// Open a particle file for buffered reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StreamError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> SimulationReader<R> {
    /// Wrap any byte source.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_f32(&mut self) -> Result<f32, StreamError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32, StreamError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read the header: `(particles_per_meter, particle_count)`.
    pub fn read_header(&mut self) -> Result<(f32, u32), StreamError> {
        let ppm = self.read_f32()?;
        let count = self.read_u32()?;
        if !ppm.is_finite() || ppm <= 0.0 {
            return Err(StreamError::InvalidHeader(format!(
                "particles per meter must be positive and finite, got {ppm}"
            )));
        }
        Ok((ppm, count))
    }

    /// Read one 3-component vector.
    pub fn read_vec3(&mut self) -> Result<Vec3, StreamError> {
        Ok(Vec3::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }
}

/// Writer over the binary particle format.
pub struct SimulationWriter<W: Write> {
    inner: W,
}

impl SimulationWriter<BufWriter<File>> {
    /// Create a particle file for buffered writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StreamError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SimulationWriter<W> {
    /// Wrap any byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write the header.
    pub fn write_header(&mut self, ppm: f32, count: u32) -> Result<(), StreamError> {
        self.inner.write_all(&ppm.to_le_bytes())?;
        self.inner.write_all(&count.to_le_bytes())?;
        Ok(())
    }

    /// Write one 3-component vector.
    pub fn write_vec3(&mut self, v: Vec3) -> Result<(), StreamError> {
        self.inner.write_all(&v.x.to_le_bytes())?;
        self.inner.write_all(&v.y.to_le_bytes())?;
        self.inner.write_all(&v.z.to_le_bytes())?;
        Ok(())
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.inner.flush()?;
        Ok(())
    }
}
