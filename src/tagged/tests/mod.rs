
use std::any::Any;

use tracing_subscriber::EnvFilter;

use crate::codec::Codec;
use crate::codec::builtin::{BoolCodec, I32Codec, StringCodec};
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};
use crate::tagged::{IdCodec, Polymorphic};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A small closed family: text and numbers get their own tags, flags only
/// go through the fallback.
#[derive(Debug, PartialEq)]
enum Root {
    Text(String),
    Number(i32),
    Flag(bool),
}

impl Polymorphic for Root {
    fn concrete(&self) -> &dyn Any {
        match self {
            Root::Text(s) => s,
            Root::Number(n) => n,
            Root::Flag(b) => b,
        }
    }
}

/// Fallback for `Root`: only understands flags.
struct FlagFallback;

impl Codec<Root> for FlagFallback {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Root, DecodeError> {
        Ok(Root::Flag(BoolCodec.read(ctx)?))
    }

    fn write(&self, value: &Root, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        match value {
            Root::Flag(b) => ctx.write_bool(*b),
            _ => Err(EncodeError::TypeMismatch { expected: "bool" }),
        }
    }
}

fn root_builder() -> crate::tagged::IdCodecBuilder<Root> {
    IdCodec::<Root>::builder()
        .variant(0, StringCodec, Root::Text)
        .variant(1, I32Codec, Root::Number)
}

fn root_codec() -> IdCodec<Root> {
    root_builder().fallback(FlagFallback).build().unwrap()
}
