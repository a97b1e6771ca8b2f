// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic UID request/assignment tracking (spec.md §4.7).
//!
//! A controller requests UIDs for a batch of responder IDs (RIDs) via
//! REQUEST_DYNAMIC_UIDS; the broker's ASSIGNED_DYNAMIC_UIDS reply may
//! span multiple PDUs, signalled by `more_coming`. This tracker
//! accumulates the chain and reports the assignment only once complete.

use crate::core::cid::Cid;
use crate::core::uid::Uid;
use crate::protocol::broker::DynamicUidMapping;

/// Accumulates a chain of ASSIGNED_DYNAMIC_UIDS PDUs for one in-flight
/// request batch.
#[derive(Default)]
pub struct DynamicUidTracker {
    accumulated: Vec<DynamicUidMapping>,
}

impl DynamicUidTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one ASSIGNED_DYNAMIC_UIDS PDU's worth of mappings. Returns
    /// the full mapping list once `more_coming` is false, `None` while
    /// more PDUs are still expected.
    pub fn ingest(&mut self, mut mappings: Vec<DynamicUidMapping>, more_coming: bool) -> Option<Vec<DynamicUidMapping>> {
        self.accumulated.append(&mut mappings);
        if more_coming {
            None
        } else {
            Some(std::mem::take(&mut self.accumulated))
        }
    }
}

/// Look up the assigned UID for `rid` within a completed mapping batch.
#[must_use]
pub fn find_assignment(mappings: &[DynamicUidMapping], rid: Cid) -> Option<Uid> {
    mappings.iter().find(|m| m.rid == rid).and_then(|m| m.assigned_uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RdmnetStatus;

    fn mapping(rid_byte: u8, uid: Option<Uid>) -> DynamicUidMapping {
        DynamicUidMapping { rid: Cid::from_bytes([rid_byte; 16]), assigned_uid: uid, status: None }
    }

    #[test]
    fn single_pdu_batch_resolves_immediately() {
        let mut tracker = DynamicUidTracker::new();
        let batch = vec![mapping(0x11, Some(Uid::new(0x6574 | 0x8000, 1)))];
        let result = tracker.ingest(batch, false);
        assert!(result.is_some());
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn more_coming_accumulates_across_pdus() {
        let mut tracker = DynamicUidTracker::new();
        assert!(tracker.ingest(vec![mapping(0x11, Some(Uid::new(0x6574 | 0x8000, 1)))], true).is_none());
        assert!(tracker.ingest(vec![mapping(0x22, Some(Uid::new(0x6574 | 0x8000, 2)))], true).is_none());
        let result = tracker.ingest(vec![mapping(0x33, Some(Uid::new(0x6574 | 0x8000, 3)))], false);
        assert_eq!(result.unwrap().len(), 3);
    }

    #[test]
    fn find_assignment_matches_by_rid() {
        let mappings = vec![mapping(0x11, Some(Uid::new(0x6574 | 0x8000, 1))), mapping(0x22, None)];
        assert_eq!(find_assignment(&mappings, Cid::from_bytes([0x11; 16])), Some(Uid::new(0x6574 | 0x8000, 1)));
        assert_eq!(find_assignment(&mappings, Cid::from_bytes([0x22; 16])), None);
    }

    #[test]
    fn failed_assignment_surfaces_status_not_a_uid() {
        let m = DynamicUidMapping {
            rid: Cid::from_bytes([0x44; 16]),
            assigned_uid: None,
            status: Some(RdmnetStatus::CapacityExceeded),
        };
        assert_eq!(find_assignment(&[m], Cid::from_bytes([0x44; 16])), None);
    }
}
