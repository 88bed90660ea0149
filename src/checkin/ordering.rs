use std::cmp::Ordering;

use super::record::CheckInRecord;

/// Compares two records by board position: priority rank, then creation time
/// (records without a timestamp last), then id.
pub fn compare(a: &CheckInRecord, b: &CheckInRecord) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// Returns the records in display order. Pure; the input is left untouched.
pub fn order<'a, I>(records: I) -> Vec<CheckInRecord>
where
    I: IntoIterator<Item = &'a CheckInRecord>,
{
    let mut sorted: Vec<CheckInRecord> = records.into_iter().cloned().collect();
    sorted.sort_by(compare);
    sorted
}
