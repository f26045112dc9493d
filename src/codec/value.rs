//! A dynamically-typed value over the built-in types.
//!
//! [`Value`] is the "any object" of the framework: a closed set of variants
//! covering every built-in codec, tagged with a single byte on the wire.
//! Tags are stable and must never be renumbered:
//!
//! | Tag | Variant  | Payload                                  |
//! |-----|----------|------------------------------------------|
//! | 0   | `String` | 32-bit prefixed UTF-8                    |
//! | 1   | `Byte`   | `i8`                                     |
//! | 2   | `Short`  | `i16`                                    |
//! | 3   | `Int`    | `i32`                                    |
//! | 4   | `Long`   | `i64`                                    |
//! | 5   | `Float`  | `f32`                                    |
//! | 6   | `Double` | `f64`                                    |
//! | 7   | `Uuid`   | two `i64`                                |
//! | 8   | `Bool`   | one byte                                 |
//! | 9   | `Char`   | one 16-bit code unit                     |
//! | 10  | `List`   | `[i32 count][Value…]`                    |
//! | 11  | `Set`    | `[i32 count][Value…]`                    |
//! | 12  | `Map`    | `[i32 count][Value Value]…`              |
//!
//! Each container level counts against the registry's `max_depth`.

use uuid::Uuid;

use super::Codec;
use super::builtin::UuidCodec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};

const TAG_STRING: i8 = 0;
const TAG_BYTE: i8 = 1;
const TAG_SHORT: i8 = 2;
const TAG_INT: i8 = 3;
const TAG_LONG: i8 = 4;
const TAG_FLOAT: i8 = 5;
const TAG_DOUBLE: i8 = 6;
const TAG_UUID: i8 = 7;
const TAG_BOOL: i8 = 8;
const TAG_CHAR: i8 = 9;
const TAG_LIST: i8 = 10;
const TAG_SET: i8 = 11;
const TAG_MAP: i8 = 12;

/// A value of any built-in type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 text.
    String(String),
    /// Signed byte.
    Byte(i8),
    /// 16-bit integer.
    Short(i16),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// 128-bit UUID.
    Uuid(Uuid),
    /// Boolean.
    Bool(bool),
    /// 16-bit character.
    Char(char),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Unordered collection; uniqueness is the producer's concern.
    Set(Vec<Value>),
    /// Key/value pairs in encounter order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Wire tag of this variant.
    pub fn tag(&self) -> i8 {
        match self {
            Value::String(_) => TAG_STRING,
            Value::Byte(_) => TAG_BYTE,
            Value::Short(_) => TAG_SHORT,
            Value::Int(_) => TAG_INT,
            Value::Long(_) => TAG_LONG,
            Value::Float(_) => TAG_FLOAT,
            Value::Double(_) => TAG_DOUBLE,
            Value::Uuid(_) => TAG_UUID,
            Value::Bool(_) => TAG_BOOL,
            Value::Char(_) => TAG_CHAR,
            Value::List(_) => TAG_LIST,
            Value::Set(_) => TAG_SET,
            Value::Map(_) => TAG_MAP,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

/// Codec for [`Value`]: a one-byte tag followed by the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCodec;

impl ValueCodec {
    fn read_values(ctx: &mut ReadContext<'_>) -> Result<Vec<Value>, DecodeError> {
        let count = ctx.read_count()?;
        let mut items = Vec::with_capacity(count.min(1024));
        for index in 0..count {
            let item = ValueCodec.read(ctx).map_err(|e| DecodeError::ListElement {
                index,
                source: Box::new(e),
            })?;
            items.push(item);
        }
        Ok(items)
    }

    fn write_values(values: &[Value], ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_count(values.len())?;
        for (index, item) in values.iter().enumerate() {
            ValueCodec
                .write(item, ctx)
                .map_err(|e| EncodeError::ListElement {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn read_payload(tag: i8, ctx: &mut ReadContext<'_>) -> Result<Value, DecodeError> {
        Ok(match tag {
            TAG_STRING => Value::String(ctx.read_string()?.ok_or(
                DecodeError::UnexpectedNull {
                    type_name: "Value::String",
                },
            )?),
            TAG_BYTE => Value::Byte(ctx.read_i8()?),
            TAG_SHORT => Value::Short(ctx.read_i16()?),
            TAG_INT => Value::Int(ctx.read_i32()?),
            TAG_LONG => Value::Long(ctx.read_i64()?),
            TAG_FLOAT => Value::Float(ctx.read_f32()?),
            TAG_DOUBLE => Value::Double(ctx.read_f64()?),
            TAG_UUID => Value::Uuid(UuidCodec.read(ctx)?),
            TAG_BOOL => Value::Bool(ctx.read_bool()?),
            TAG_CHAR => Value::Char(ctx.read_char()?),
            TAG_LIST => Value::List(Self::read_values(ctx)?),
            TAG_SET => Value::Set(Self::read_values(ctx)?),
            TAG_MAP => {
                let count = ctx.read_count()?;
                let mut entries = Vec::with_capacity(count.min(1024));
                for index in 0..count {
                    let entry = ValueCodec
                        .read(ctx)
                        .and_then(|key| Ok((key, ValueCodec.read(ctx)?)))
                        .map_err(|e| DecodeError::MapEntry {
                            index,
                            source: Box::new(e),
                        })?;
                    entries.push(entry);
                }
                Value::Map(entries)
            }
            other => {
                return Err(DecodeError::UnknownTag {
                    tag: i32::from(other),
                });
            }
        })
    }

    fn write_payload(value: &Value, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        match value {
            Value::String(s) => ctx.write_str(s),
            Value::Byte(v) => ctx.write_i8(*v),
            Value::Short(v) => ctx.write_i16(*v),
            Value::Int(v) => ctx.write_i32(*v),
            Value::Long(v) => ctx.write_i64(*v),
            Value::Float(v) => ctx.write_f32(*v),
            Value::Double(v) => ctx.write_f64(*v),
            Value::Uuid(v) => UuidCodec.write(v, ctx),
            Value::Bool(v) => ctx.write_bool(*v),
            Value::Char(v) => ctx.write_char(*v),
            Value::List(items) | Value::Set(items) => Self::write_values(items, ctx),
            Value::Map(entries) => {
                ctx.write_count(entries.len())?;
                for (index, (key, val)) in entries.iter().enumerate() {
                    ValueCodec
                        .write(key, ctx)
                        .and_then(|()| ValueCodec.write(val, ctx))
                        .map_err(|e| EncodeError::MapEntry {
                            index,
                            source: Box::new(e),
                        })?;
                }
                Ok(())
            }
        }
    }
}

impl Codec<Value> for ValueCodec {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Value, DecodeError> {
        let tag = ctx.read_i8()?;
        match tag {
            TAG_STRING..=TAG_CHAR => Self::read_payload(tag, ctx),
            TAG_LIST..=TAG_MAP => ctx
                .nested(|ctx| Self::read_payload(tag, ctx))
                .map_err(|e| DecodeError::Variant {
                    tag: i32::from(tag),
                    source: Box::new(e),
                }),
            other => Err(DecodeError::UnknownTag {
                tag: i32::from(other),
            }),
        }
    }

    fn write(&self, value: &Value, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        let tag = value.tag();
        ctx.write_i8(tag)?;
        match value {
            Value::List(_) | Value::Set(_) | Value::Map(_) => Self::write_payload(value, ctx)
                .map_err(|e| EncodeError::Variant {
                    tag: i32::from(tag),
                    source: Box::new(e),
                }),
            _ => Self::write_payload(value, ctx),
        }
    }
}
