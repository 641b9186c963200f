use crate::error::Result;
use crate::utils::constants::DEFAULT_COPY_BUFFER_SIZE;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Concatenates worker shards into the final data file in the order given,
/// streaming through a fixed-size buffer and deleting each shard once copied.
pub struct ShardAssembler {
    buffer_size: usize,
}

impl ShardAssembler {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Returns the number of bytes written to `destination`
    pub fn assemble(&self, shards: &[PathBuf], destination: &Path) -> Result<u64> {
        let mut output = BufWriter::new(File::create(destination)?);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total = 0u64;

        for shard in shards {
            let copied = Self::copy_shard(shard, &mut output, &mut buffer)?;
            std::fs::remove_file(shard)?;
            debug!(shard = %shard.display(), bytes = copied, "appended shard");
            total += copied;
        }

        output.flush()?;
        Ok(total)
    }

    fn copy_shard<W: Write>(shard: &Path, output: &mut W, buffer: &mut [u8]) -> Result<u64> {
        let mut input = File::open(shard)?;
        let mut copied = 0u64;

        loop {
            let read = match input.read(buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            output.write_all(&buffer[..read])?;
            copied += read as u64;
        }

        Ok(copied)
    }
}

impl Default for ShardAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_assemble_preserves_order_and_removes_shards() -> Result<()> {
        let dir = TempDir::new()?;
        let shards: Vec<PathBuf> = (0..3)
            .map(|i| dir.path().join(format!(".shard_{}.txt", i)))
            .collect();
        std::fs::write(&shards[0], "a;1.0\n")?;
        std::fs::write(&shards[1], "")?;
        std::fs::write(&shards[2], "b;2.0\nc;3.0\n")?;

        let destination = dir.path().join("measurements.txt");
        // Tiny buffer forces several reads per shard
        let written = ShardAssembler::new()
            .with_buffer_size(4)
            .assemble(&shards, &destination)?;

        assert_eq!(written, 18);
        assert_eq!(
            std::fs::read_to_string(&destination)?,
            "a;1.0\nb;2.0\nc;3.0\n"
        );
        assert!(shards.iter().all(|s| !s.exists()));

        Ok(())
    }

    #[test]
    fn test_missing_shard_fails() {
        let dir = TempDir::new().unwrap();
        let result = ShardAssembler::new().assemble(
            &[dir.path().join("absent.txt")],
            &dir.path().join("out.txt"),
        );
        assert!(result.is_err());
    }
}
