#![forbid(unsafe_code)]

//! Display ordering of fields.
//!
//! Fields with an explicit order index come first, in ascending index order.
//! Fields without one follow in insertion order. Equal indices keep insertion
//! order, so the result is deterministic for a given insertion sequence.

/// Order `(id, order_index)` pairs given in insertion order.
pub fn ordered_ids<'a, I>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, Option<u32>)>,
{
    let mut indexed: Vec<(u32, usize, &str)> = Vec::new();
    let mut unindexed: Vec<&str> = Vec::new();

    for (position, (id, index)) in entries.into_iter().enumerate() {
        match index {
            Some(index) => indexed.push((index, position, id)),
            None => unindexed.push(id),
        }
    }

    indexed.sort_unstable_by_key(|&(index, position, _)| (index, position));

    indexed
        .into_iter()
        .map(|(_, _, id)| id)
        .chain(unindexed)
        .map(str::to_string)
        .collect()
}
