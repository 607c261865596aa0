// Span deduplication
// Greedy interval selection so that no two emitted records of one detector share a position

use crate::models::DetectionRecord;

/// Highest confidence wins; ties go to the earlier span. Output is in text order.
pub fn dedupe_by_confidence(mut records: Vec<DetectionRecord>) -> Vec<DetectionRecord> {
    records.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.start_offset.cmp(&b.start_offset))
    });

    let mut kept: Vec<DetectionRecord> = Vec::with_capacity(records.len());
    for record in records {
        if !kept
            .iter()
            .any(|k| k.overlaps(record.start_offset, record.end_offset))
        {
            kept.push(record);
        }
    }

    kept.sort_by_key(|r| r.start_offset);
    kept
}

/// Earliest start wins, longer span first on ties
pub fn dedupe_by_position(mut records: Vec<DetectionRecord>) -> Vec<DetectionRecord> {
    records.sort_by(|a, b| {
        a.start_offset
            .cmp(&b.start_offset)
            .then(b.len().cmp(&a.len()))
    });

    let mut kept: Vec<DetectionRecord> = Vec::with_capacity(records.len());
    let mut last_end = 0usize;
    for record in records {
        if kept.is_empty() || record.start_offset >= last_end {
            last_end = record.end_offset;
            kept.push(record);
        }
    }
    kept
}
