use crate::types::holiday::HolidayOffsetConfig;

use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Config entry {index} not found ({len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
}

pub fn unix_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Assigns update timestamps to a submitted array. An entry equal to a stored
/// one (timestamp aside) keeps the stored timestamp; every other entry is
/// stamped with `now_millis`. Each stored entry matches at most once.
pub fn stamp_submitted(
    previous: &[HolidayOffsetConfig],
    submitted: Vec<HolidayOffsetConfig>,
    now_millis: i64,
) -> Vec<HolidayOffsetConfig> {
    let mut unmatched: Vec<Option<&HolidayOffsetConfig>> = previous.iter().map(Some).collect();
    submitted
        .into_iter()
        .map(|mut entry| {
            let prior = unmatched
                .iter_mut()
                .find(|slot| matches!(slot, Some(prior) if prior.same_content(&entry)))
                .and_then(Option::take);
            match prior.map(HolidayOffsetConfig::update_timestamp) {
                Some(Some(timestamp)) => entry.set_update_timestamp(timestamp),
                Some(None) => entry.clear_update_timestamp(),
                None => entry.set_update_timestamp(now_millis),
            }
            entry
        })
        .collect()
}

pub fn append_entry(
    entries: &mut Vec<HolidayOffsetConfig>,
    mut entry: HolidayOffsetConfig,
    now_millis: i64,
) -> usize {
    entry.set_update_timestamp(now_millis);
    entries.push(entry);
    entries.len() - 1
}

pub fn replace_entry(
    entries: &mut [HolidayOffsetConfig],
    index: usize,
    mut entry: HolidayOffsetConfig,
    now_millis: i64,
) -> Result<HolidayOffsetConfig, EditError> {
    let len = entries.len();
    let slot = entries
        .get_mut(index)
        .ok_or(EditError::IndexOutOfRange { index, len })?;
    entry.set_update_timestamp(now_millis);
    Ok(std::mem::replace(slot, entry))
}

pub fn remove_entry(
    entries: &mut Vec<HolidayOffsetConfig>,
    index: usize,
) -> Result<HolidayOffsetConfig, EditError> {
    if index >= entries.len() {
        return Err(EditError::IndexOutOfRange {
            index,
            len: entries.len(),
        });
    }
    Ok(entries.remove(index))
}
