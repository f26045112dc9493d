//! One-shot encode/decode helpers over buffers and files.
//!
//! Each helper creates a fresh context for the call, so side data never
//! leaks between top-level operations.
//!
//! File writes encode into memory first, so a failing codec never touches
//! the disk. The bytes then go to a temporary sibling, are fsynced, renamed
//! over the destination and the parent directory is fsynced: a crash leaves
//! either the old file or the new one, never a torn write. File reads memory-map the file and decode straight
//! from the mapped bytes.

use std::any::Any;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, info};

use crate::codec::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};
use crate::registry::Registry;

const TMP_SUFFIX: &str = ".tmp";

// ------------------------------------------------------------------------------------------------
// In-memory
// ------------------------------------------------------------------------------------------------

/// Encodes `value` with `codec` into a fresh buffer.
pub fn encode_to_vec<T, C>(registry: &Registry, codec: &C, value: &T) -> Result<Vec<u8>, EncodeError>
where
    C: Codec<T> + ?Sized,
{
    let mut buf = Vec::new();
    let mut ctx = WriteContext::new(registry, &mut buf);
    codec.write(value, &mut ctx)?;
    drop(ctx);
    Ok(buf)
}

/// Decodes one `T` with `codec` from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed; trailing bytes are
/// left for the caller.
pub fn decode_from_slice<T, C>(
    registry: &Registry,
    codec: &C,
    bytes: &[u8],
) -> Result<(T, usize), DecodeError>
where
    C: Codec<T> + ?Sized,
{
    let mut cursor = bytes;
    let value = {
        let mut ctx = ReadContext::new(registry, &mut cursor);
        codec.read(&mut ctx)?
    };
    Ok((value, bytes.len() - cursor.len()))
}

/// Encodes `value` with the codec the registry resolves for `T`.
pub fn encode_object_to_vec<T: Any>(registry: &Registry, value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    let mut ctx = WriteContext::new(registry, &mut buf);
    ctx.write_object(value)?;
    drop(ctx);
    Ok(buf)
}

/// Decodes a `T` with the codec registered for exactly `T`.
pub fn decode_object_from_slice<T: Any>(
    registry: &Registry,
    bytes: &[u8],
) -> Result<(T, usize), DecodeError> {
    let mut cursor = bytes;
    let value = {
        let mut ctx = ReadContext::new(registry, &mut cursor);
        ctx.read_object::<T>()?
    };
    Ok((value, bytes.len() - cursor.len()))
}

// ------------------------------------------------------------------------------------------------
// Files
// ------------------------------------------------------------------------------------------------

/// Encodes `value` into the file at `path`, replacing it atomically.
///
/// Returns the number of bytes written.
pub fn encode_to_file<T, C>(
    registry: &Registry,
    codec: &C,
    value: &T,
    path: impl AsRef<Path>,
) -> Result<u64, EncodeError>
where
    C: Codec<T> + ?Sized,
{
    let path = path.as_ref();
    let bytes = encode_to_vec(registry, codec, value)?;

    let tmp_path = tmp_path(path);
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    fsync_dir(path)?;

    let len = bytes.len() as u64;
    info!(path = %path.display(), bytes = len, "encoded to file");
    Ok(len)
}

/// Decodes one `T` from the file at `path`.
///
/// Bytes left after the value are ignored.
///
/// # Safety
///
/// Uses `unsafe { Mmap::map(...) }`. The mapping is read-only and every
/// read through it is bounds-checked by the slice reader; the caller must
/// not truncate the file while the call is running.
pub fn decode_from_file<T, C>(
    registry: &Registry,
    codec: &C,
    path: impl AsRef<Path>,
) -> Result<T, DecodeError>
where
    C: Codec<T> + ?Sized,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let (value, consumed) = if file_len == 0 {
        decode_from_slice(registry, codec, &[])?
    } else {
        let mmap = unsafe { Mmap::map(&file)? };
        decode_from_slice(registry, codec, &mmap[..])?
    };

    if (consumed as u64) < file_len {
        debug!(
            path = %path.display(),
            trailing = file_len - consumed as u64,
            "trailing bytes after decoded value"
        );
    }
    info!(path = %path.display(), bytes = consumed, "decoded from file");
    Ok(value)
}

/// Makes the rename of `path` durable by syncing its parent directory.
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}
