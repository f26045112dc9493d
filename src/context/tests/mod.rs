
use tracing_subscriber::EnvFilter;

use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};
use crate::registry::Registry;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Runs `f` against a fresh write context and returns the bytes it wrote.
fn write_with<F>(registry: &Registry, f: F) -> Vec<u8>
where
    F: FnOnce(&mut WriteContext<'_>) -> Result<(), EncodeError>,
{
    let mut buf = Vec::new();
    let mut ctx = WriteContext::new(registry, &mut buf);
    f(&mut ctx).unwrap();
    drop(ctx);
    buf
}

/// Runs `f` against a fresh read context over `bytes`.
fn read_with<T, F>(registry: &Registry, bytes: &[u8], f: F) -> Result<T, DecodeError>
where
    F: FnOnce(&mut ReadContext<'_>) -> Result<T, DecodeError>,
{
    let mut input = bytes;
    let mut ctx = ReadContext::new(registry, &mut input);
    f(&mut ctx)
}
