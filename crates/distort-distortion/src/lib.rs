use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

/// Applies the worker's distortion transform to `input`, writing the result
/// to `output`. The real per-class distortion algorithms (waveform
/// scrambling for audio, pixel shuffling for images, text substitution
/// ciphers, and so on) are out of scope here; this is a placeholder byte
/// rotation that is deterministic and trivially reversible, so the rest of
/// the pipeline — checksum verification, resumable transfer, checkpointing —
/// can be exercised end to end without depending on class-specific codecs.
pub fn distort(input: &Path, output: &Path, factor: u32) -> std::io::Result<()> {
    let shift = (factor % 256) as u8;
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);

    let mut buf = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for byte in &mut buf[..n] {
            *byte = byte.wrapping_add(shift);
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;

    debug!(bytes = total, factor, "distortion: applied byte rotation");
    Ok(())
}

/// Inverse of [`distort`], used by tests to confirm the transform is lossless
/// for this placeholder algorithm.
pub fn undistort(input: &Path, output: &Path, factor: u32) -> std::io::Result<()> {
    distort(input, output, 256 - (factor % 256))
}
