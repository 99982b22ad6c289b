use crate::error::{DatasetError, Result};
use crate::models::MetadataRecord;

const PREFIX: &str = "design_";
const SUFFIX: &str = ".jpeg";

/// Extensions the ingest job picks up. Matched case-sensitively on the name.
pub const INPUT_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

pub fn canonical_name(index: u64) -> String {
    format!("{}{}{}", PREFIX, index, SUFFIX)
}

/// The `N` of `design_<N>.jpeg` when it is all ASCII digits.
fn canonical_digits(name: &str) -> Option<&str> {
    let digits = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

/// `design_<N>.jpeg` -> `N`. Anything else, including a non-integer `N` or
/// one too large for `u64`, is `None`.
pub fn parse_canonical_index(name: &str) -> Option<u64> {
    canonical_digits(name)?.parse().ok()
}

/// One past the highest canonical index already in use, or 1 for a fresh log.
///
/// Fails when that next index doesn't fit in a `u64`.
pub fn next_index<'a, I>(records: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a MetadataRecord>,
{
    let mut last: Option<(u64, &str)> = None;
    for record in records {
        let Some(digits) = canonical_digits(&record.file_name) else {
            continue;
        };
        let index: u64 = digits.parse().map_err(|_| DatasetError::IndexExhausted {
            file_name: record.file_name.clone(),
        })?;
        if last.map_or(true, |(max, _)| index > max) {
            last = Some((index, &record.file_name));
        }
    }

    match last {
        None => Ok(1),
        Some((max, file_name)) => {
            max.checked_add(1)
                .ok_or_else(|| DatasetError::IndexExhausted {
                    file_name: file_name.to_string(),
                })
        }
    }
}

pub fn is_input_image(name: &str) -> bool {
    INPUT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
