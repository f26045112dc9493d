mod tests_lineage;
mod tests_registration;

use tracing_subscriber::EnvFilter;

use crate::codec::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};
use crate::registry::Registry;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Writes a single marker byte for any value, so tests can tell which
/// registered codec ran.
struct Marker(u8);

impl<T> Codec<T> for Marker {
    fn read(&self, _: &mut ReadContext<'_>) -> Result<T, DecodeError> {
        Err(DecodeError::Custom(format!("marker {} is write-only", self.0)))
    }

    fn write(&self, _: &T, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_u8(self.0)
    }
}

/// Writes `value` through the registry and returns the bytes.
fn write_object<T: std::any::Any>(registry: &Registry, value: &T) -> Result<Vec<u8>, EncodeError> {
    crate::stream::encode_object_to_vec(registry, value)
}
