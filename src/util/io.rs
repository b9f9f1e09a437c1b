use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read up to `size` bytes, stopping early only at end of input.
///
/// Unlike a single `read` call this keeps reading until the buffer is full,
/// so every chunk but the last has exactly `size` bytes. An empty vector
/// means the reader is exhausted.
pub async fn read_chunk<R>(reader: &mut R, size: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; size];
    let mut filled = 0;
    while filled < size {
        let n = reader.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buffer.truncate(filled);
    Ok(buffer)
}
