//! Hashmap dictionaries stored in cells.
//!
//! TL-B definitions:
//!
//! ```text
//! hm_edge#_ {n:#} {X:Type} {l:#} {m:#} label:(HmLabel ~l n)
//!           {n = (~m) + l} node:(HashmapNode m X) = Hashmap n X;
//! hmn_leaf#_ {X:Type} value:X = HashmapNode 0 X;
//! hmn_fork#_ {n:#} {X:Type} left:^(Hashmap n X)
//!            right:^(Hashmap n X) = HashmapNode (n + 1) X;
//!
//! hml_short$0 {m:#} {n:#} len:(Unary ~n) {n <= m} s:(n * Bit) = HmLabel ~n m;
//! hml_long$10 {m:#} n:(#<= m) s:(n * Bit) = HmLabel ~n m;
//! hml_same$11 {m:#} v:Bit n:(#<= m) = HmLabel ~n m;
//!
//! hme_empty$0 {n:#} {X:Type} = HashmapE n X;
//! hme_root$1 {n:#} {X:Type} root:^(Hashmap n X) = HashmapE n X;
//! ```
//!
//! Keys are handled as bit vectors, most significant bit first.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Cell, CellBuilder, CellError, CellResult, CellSlice};

/// Dictionary key as a sequence of bits (MSB first).
pub type DictKey = Vec<bool>;

/// Number of bits used to store a `#<= max` value.
fn len_bits(max: usize) -> usize {
    (usize::BITS - max.leading_zeros()) as usize
}

/// Load every entry of a `Hashmap n X` rooted at `root`.
///
/// `load_value` is invoked on the leaf slice positioned right after the edge
/// label. Entries are returned in ascending key order.
pub fn load_hashmap<V, F>(root: &Cell, key_bits: usize, mut load_value: F) -> CellResult<Vec<(DictKey, V)>>
where
    F: FnMut(&mut CellSlice<'_>) -> CellResult<V>,
{
    let mut entries = Vec::new();
    let mut prefix = Vec::with_capacity(key_bits);
    load_edge(root, key_bits, &mut prefix, &mut entries, &mut load_value)?;
    Ok(entries)
}

fn load_edge<V, F>(
    cell: &Cell,
    remaining: usize,
    prefix: &mut DictKey,
    entries: &mut Vec<(DictKey, V)>,
    load_value: &mut F,
) -> CellResult<()>
where
    F: FnMut(&mut CellSlice<'_>) -> CellResult<V>,
{
    let mut slice = CellSlice::new(cell);
    let label = load_label(&mut slice, remaining)?;
    let label_len = label.len();
    prefix.extend(label);

    let rest = remaining - label_len;
    if rest == 0 {
        let value = load_value(&mut slice)?;
        entries.push((prefix.clone(), value));
    } else {
        let left = slice.load_ref()?;
        let right = slice.load_ref()?;

        prefix.push(false);
        load_edge(left, rest - 1, prefix, entries, load_value)?;
        prefix.pop();

        prefix.push(true);
        load_edge(right, rest - 1, prefix, entries, load_value)?;
        prefix.pop();
    }

    prefix.truncate(prefix.len() - label_len);
    Ok(())
}

fn load_label(slice: &mut CellSlice<'_>, max: usize) -> CellResult<DictKey> {
    let label = if !slice.load_bit()? {
        // hml_short$0
        let mut len = 0;
        while slice.load_bit()? {
            len += 1;
        }
        if len > max {
            return Err(CellError::InvalidDictionary(format!(
                "label length {} exceeds remaining key bits {}",
                len, max
            )));
        }
        slice.load_bits(len)?
    } else if !slice.load_bit()? {
        // hml_long$10
        let len = slice.load_uint(len_bits(max))? as usize;
        if len > max {
            return Err(CellError::InvalidDictionary(format!(
                "label length {} exceeds remaining key bits {}",
                len, max
            )));
        }
        slice.load_bits(len)?
    } else {
        // hml_same$11
        let bit = slice.load_bit()?;
        let len = slice.load_uint(len_bits(max))? as usize;
        if len > max {
            return Err(CellError::InvalidDictionary(format!(
                "label length {} exceeds remaining key bits {}",
                len, max
            )));
        }
        vec![bit; len]
    };
    Ok(label)
}

/// Build a `Hashmap n X` root cell from non-empty entries.
///
/// Each value builder is appended to its leaf right after the edge label.
pub fn build_hashmap(entries: &BTreeMap<DictKey, CellBuilder>, key_bits: usize) -> CellResult<Cell> {
    if entries.is_empty() {
        return Err(CellError::InvalidDictionary(
            "cannot build an empty Hashmap, use HashmapE".to_string(),
        ));
    }
    if let Some((key, _)) = entries.iter().find(|(k, _)| k.len() != key_bits) {
        return Err(CellError::InvalidDictionary(format!(
            "key has {} bits, expected {}",
            key.len(),
            key_bits
        )));
    }

    let items: Vec<(&[bool], &CellBuilder)> =
        entries.iter().map(|(k, v)| (k.as_slice(), v)).collect();
    build_edge(&items, key_bits)
}

/// Store a `HashmapE n X` into the builder.
pub fn store_dict(
    builder: &mut CellBuilder,
    entries: &BTreeMap<DictKey, CellBuilder>,
    key_bits: usize,
) -> CellResult<()> {
    if entries.is_empty() {
        builder.store_bit(false)?;
    } else {
        let root = build_hashmap(entries, key_bits)?;
        builder.store_maybe_ref(Some(Arc::new(root)))?;
    }
    Ok(())
}

fn build_edge(items: &[(&[bool], &CellBuilder)], remaining: usize) -> CellResult<Cell> {
    let first = items[0].0;
    let common = items[1..].iter().fold(remaining, |acc, (key, _)| {
        let same = first.iter().zip(key.iter()).take_while(|(a, b)| a == b).count();
        acc.min(same)
    });

    let mut builder = CellBuilder::new();
    store_label(&mut builder, &first[..common], remaining)?;

    if common == remaining {
        builder.store_builder(items[0].1)?;
    } else {
        let rest = remaining - common - 1;
        let (left, right): (Vec<_>, Vec<_>) = items
            .iter()
            .map(|(key, value)| (&key[common..], *value))
            .partition(|(key, _)| !key[0]);
        let left: Vec<_> = left.into_iter().map(|(k, v)| (&k[1..], v)).collect();
        let right: Vec<_> = right.into_iter().map(|(k, v)| (&k[1..], v)).collect();

        builder.store_ref(Arc::new(build_edge(&left, rest)?))?;
        builder.store_ref(Arc::new(build_edge(&right, rest)?))?;
    }

    builder.build()
}

fn store_label(builder: &mut CellBuilder, label: &[bool], max: usize) -> CellResult<()> {
    let len = label.len();
    let width = len_bits(max);

    let short_cost = 2 + 2 * len;
    let long_cost = 2 + width + len;
    let same_cost = if len > 0 && label.iter().all(|b| *b == label[0]) {
        Some(3 + width)
    } else {
        None
    };

    if let Some(cost) = same_cost
        && cost < short_cost.min(long_cost)
    {
        builder.store_bits(&[true, true])?;
        builder.store_bit(label[0])?;
        builder.store_uint(len as u64, width)?;
    } else if short_cost <= long_cost {
        builder.store_bit(false)?;
        for _ in 0..len {
            builder.store_bit(true)?;
        }
        builder.store_bit(false)?;
        builder.store_bits(label)?;
    } else {
        builder.store_bits(&[true, false])?;
        builder.store_uint(len as u64, width)?;
        builder.store_bits(label)?;
    }
    Ok(())
}

/// Convert the first `bits` bits of a byte string into a key.
pub fn key_from_bytes(bytes: &[u8], bits: usize) -> DictKey {
    (0..bits)
        .map(|i| bytes.get(i / 8).is_some_and(|b| (b >> (7 - (i % 8))) & 1 == 1))
        .collect()
}

/// Pack a key back into bytes, zero-padding the last byte.
pub fn key_to_bytes(key: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; key.len().div_ceil(8)];
    for (i, bit) in key.iter().enumerate() {
        if *bit {
            out[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    out
}
