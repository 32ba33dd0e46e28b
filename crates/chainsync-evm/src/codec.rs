//! Parameter codec: head/tail decoding of ABI-encoded parameter blobs.
//!
//! # Layout
//! A parameter sequence is a head of fixed-size slots followed by a tail.
//! Static types (numbers, addresses, bools, `bytesN`, and fixed arrays /
//! tuples made only of static members) are stored inline in the head.
//! Dynamic types (`bytes`, `string`, `T[]`, and anything containing one) store
//! a byte offset in their head slot, relative to the start of the enclosing
//! sequence, pointing at length-prefixed content in the tail.
//!
//! Every read is bounds-checked: a blob shorter than any declared offset or
//! length yields `DecodeError::DataTooShort`, never a truncated value.
//!
//! Offsets may legally point at shared content, so nested dynamic arrays could
//! expand a small blob into an enormous value tree. Decoding therefore stops
//! with `DecodeError::TooManyValues` once it has produced more values than
//! the blob has bytes.

use chainsync_core::{
    error::DecodeError,
    event::parse_word,
    schema::ParamDescriptor,
    types::{DecodedParam, DecodedValue, ParamType, WORD},
};

use crate::normalizer;

/// Decode `data` against an ordered list of parameter descriptors.
pub fn decode(params: &[ParamDescriptor], data: &[u8]) -> Result<Vec<DecodedParam>, DecodeError> {
    let types = resolve(params.iter())?;
    let values = decode_sequence(types.iter(), data, 0, &mut budget(data))?;
    Ok(params
        .iter()
        .zip(values)
        .map(|(p, value)| DecodedParam {
            name: p.name.clone(),
            ty: p.ty.clone(),
            value,
        })
        .collect())
}

/// Decode `data` against already-resolved types.
pub fn decode_types(types: &[ParamType], data: &[u8]) -> Result<Vec<DecodedValue>, DecodeError> {
    decode_sequence(types.iter(), data, 0, &mut budget(data))
}

/// Decode an event's parameters from its topics and data blob.
///
/// topics[1..] carry the indexed parameters one-to-one in declaration order;
/// `data` is decoded against the non-indexed parameter types. The two streams
/// are merged back into the schema's declared order.
pub fn decode_log_params(
    inputs: &[ParamDescriptor],
    topics: &[String],
    data: &[u8],
) -> Result<Vec<DecodedParam>, DecodeError> {
    let data_types = resolve(inputs.iter().filter(|p| !p.indexed))?;
    let mut data_values = decode_sequence(data_types.iter(), data, 0, &mut budget(data))?.into_iter();

    let mut topic_idx = 1;
    let mut out = Vec::with_capacity(inputs.len());
    for param in inputs {
        let value = if param.indexed {
            let topic = topics
                .get(topic_idx)
                .ok_or(DecodeError::MissingTopic { index: topic_idx })?;
            topic_idx += 1;
            decode_topic(&param.param_type()?, &parse_word(topic)?)
        } else {
            data_values
                .next()
                .ok_or_else(|| DecodeError::short(data.len(), WORD, 0))?
        };
        out.push(DecodedParam {
            name: param.name.clone(),
            ty: param.ty.clone(),
            value,
        });
    }
    Ok(out)
}

/// Decode one indexed parameter from its topic.
///
/// Value types are padded to 32 bytes and recoverable. Reference types
/// (`string`, `bytes`, arrays, tuples) are stored as the keccak-256 of their
/// encoding; the original value is lost, so the hash itself is returned.
pub fn decode_topic(ty: &ParamType, topic: &[u8; 32]) -> DecodedValue {
    if ty.is_value_type() {
        normalizer::word_value(ty, topic)
    } else {
        DecodedValue::FixedBytes(format!("0x{}", hex::encode(topic)))
    }
}

/// Values a blob of this size may decode to. A well-formed encoding spends at
/// least one word per leaf value.
fn budget(data: &[u8]) -> usize {
    data.len() + WORD
}

fn resolve<'a>(params: impl Iterator<Item = &'a ParamDescriptor>) -> Result<Vec<ParamType>, DecodeError> {
    params.map(|p| p.param_type()).collect()
}

/// Decode a head/tail sequence whose head starts at `base`.
fn decode_sequence<'a>(
    types: impl Iterator<Item = &'a ParamType>,
    data: &[u8],
    base: usize,
    budget: &mut usize,
) -> Result<Vec<DecodedValue>, DecodeError> {
    let mut head = base;
    let mut out = Vec::new();
    for ty in types {
        let value = if ty.is_dynamic() {
            let offset = read_usize(data, head)?;
            let start = base.checked_add(offset).ok_or_else(|| DecodeError::OffsetOutOfRange {
                at: head,
                value: offset.to_string(),
            })?;
            decode_at(ty, data, start, budget)?
        } else {
            decode_at(ty, data, head, budget)?
        };
        head = head.saturating_add(ty.head_size());
        out.push(value);
    }
    Ok(out)
}

/// Decode a value whose encoding starts at `pos`: the head slot for static
/// types, the offset target for dynamic ones.
fn decode_at(
    ty: &ParamType,
    data: &[u8],
    pos: usize,
    budget: &mut usize,
) -> Result<DecodedValue, DecodeError> {
    *budget = budget.checked_sub(1).ok_or(DecodeError::TooManyValues {
        limit: data.len() + WORD,
    })?;
    match ty {
        ParamType::Address
        | ParamType::Bool
        | ParamType::Uint(_)
        | ParamType::Int(_)
        | ParamType::FixedBytes(_) => Ok(normalizer::word_value(ty, read_word(data, pos)?)),

        ParamType::Bytes => {
            let body = read_length_prefixed(data, pos)?;
            Ok(DecodedValue::Bytes(format!("0x{}", hex::encode(body))))
        }

        ParamType::String => {
            let body = read_length_prefixed(data, pos)?;
            Ok(DecodedValue::Str(String::from_utf8_lossy(body).into_owned()))
        }

        ParamType::Array(elem) => {
            let len = read_usize(data, pos)?;
            let body = pos + WORD;
            // Every element needs at least its head in the blob.
            let min = len.checked_mul(elem.head_size().max(1)).ok_or_else(|| {
                DecodeError::OffsetOutOfRange {
                    at: pos,
                    value: len.to_string(),
                }
            })?;
            read_slice(data, body, min)?;
            let items = decode_sequence(std::iter::repeat(elem.as_ref()).take(len), data, body, budget)?;
            Ok(DecodedValue::Array(items))
        }

        ParamType::FixedArray(elem, len) => {
            let items = decode_sequence(std::iter::repeat(elem.as_ref()).take(*len), data, pos, budget)?;
            Ok(DecodedValue::Array(items))
        }

        ParamType::Tuple(fields) => {
            let values = decode_sequence(fields.iter().map(|(_, t)| t), data, pos, budget)?;
            Ok(DecodedValue::Tuple(
                fields.iter().map(|(n, _)| n.clone()).zip(values).collect(),
            ))
        }
    }
}

fn read_slice(data: &[u8], pos: usize, len: usize) -> Result<&[u8], DecodeError> {
    let available = data.len().saturating_sub(pos);
    match pos.checked_add(len) {
        Some(end) if end <= data.len() => Ok(&data[pos..end]),
        _ => Err(DecodeError::short(pos, len, available)),
    }
}

fn read_word(data: &[u8], pos: usize) -> Result<&[u8; 32], DecodeError> {
    let slice = read_slice(data, pos, WORD)?;
    slice
        .try_into()
        .map_err(|_| DecodeError::short(pos, WORD, slice.len()))
}

/// Read an offset or length word; the value must fit in a `usize`.
fn read_usize(data: &[u8], pos: usize) -> Result<usize, DecodeError> {
    let word = read_word(data, pos)?;
    let out_of_range = || DecodeError::OffsetOutOfRange {
        at: pos,
        value: format!("0x{}", hex::encode(word)),
    };
    if word[..24].iter().any(|b| *b != 0) {
        return Err(out_of_range());
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low)).map_err(|_| out_of_range())
}

fn read_length_prefixed(data: &[u8], pos: usize) -> Result<&[u8], DecodeError> {
    let len = read_usize(data, pos)?;
    read_slice(data, pos + WORD, len)
}
