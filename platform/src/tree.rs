// Device-tree query interface and the record-backed session shared by the backends

use log::trace;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use umass_core::{Continuation, DeviceTreeQuery, EnumerationPage, MatchResult, PageStatus, UmassError};

/// Source of device-tree enumeration sessions.
pub trait DeviceTree {
    type Session: TreeSession;

    /// Open the query interface. Fails with `TreeUnavailable` when the
    /// interface is absent or the caller lacks privilege.
    fn open(&self) -> Result<Self::Session, UmassError>;
}

/// An open query handle. Dropping it releases the handle.
pub trait TreeSession {
    /// Fill `page` with the next records matching `query`, advancing the
    /// query's cursor past everything consumed.
    fn fetch(
        &mut self,
        query: &mut DeviceTreeQuery,
        page: &mut EnumerationPage,
    ) -> Result<(), UmassError>;

    /// Whether the handle still reports more records after the last fetch.
    fn has_more(&self) -> bool;
}

/// Session over an already captured, flattened record stream.
///
/// A fault may be planted at a record index; the page that would contain
/// that record comes back with `PageStatus::Error`.
#[derive(Debug)]
pub struct RecordSession {
    records: Vec<MatchResult>,
    fault: Option<(usize, u32)>,
    more: bool,
    fetches: Arc<AtomicUsize>,
}

impl RecordSession {
    pub fn new(records: Vec<MatchResult>) -> Self {
        Self {
            more: !records.is_empty(),
            records,
            fault: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_fault(mut self, index: usize, status: u32) -> Self {
        self.fault = Some((index, status));
        self
    }

    fn with_counter(mut self, fetches: Arc<AtomicUsize>) -> Self {
        self.fetches = fetches;
        self
    }
}

impl TreeSession for RecordSession {
    fn fetch(
        &mut self,
        query: &mut DeviceTreeQuery,
        page: &mut EnumerationPage,
    ) -> Result<(), UmassError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        page.clear();

        let start = query.cursor().min(self.records.len());
        let mut consumed = 0;
        for record in &self.records[start..] {
            if page.is_full() {
                break;
            }
            if let Some((index, status)) = self.fault {
                if index == start + consumed {
                    page.clear();
                    page.status = PageStatus::Error(status);
                    self.more = false;
                    return Ok(());
                }
            }
            consumed += 1;
            if query.admits(record) {
                // Cannot fail: fullness was checked above.
                let _ = page.push(record.clone());
            }
        }

        query.advance(consumed);
        self.more = query.cursor() < self.records.len();
        page.continuation = if self.more {
            Continuation::More
        } else {
            Continuation::Last
        };
        trace!(
            "served {} records from {} (more: {})",
            page.len(),
            start,
            self.more
        );
        Ok(())
    }

    fn has_more(&self) -> bool {
        self.more
    }
}

/// In-memory device tree, used to replay captured trees and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceTree {
    records: Vec<MatchResult>,
    unavailable: Option<String>,
    fault: Option<(usize, u32)>,
    fetches: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl StaticDeviceTree {
    pub fn new(records: Vec<MatchResult>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Make every `open` fail with `TreeUnavailable`.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            unavailable: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Report `status` on the page that reaches record `index`.
    pub fn with_fault(mut self, index: usize, status: u32) -> Self {
        self.fault = Some((index, status));
        self
    }

    /// Number of page fetches issued across all sessions.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DeviceTree for StaticDeviceTree {
    type Session = RecordSession;

    fn open(&self) -> Result<RecordSession, UmassError> {
        if let Some(reason) = &self.unavailable {
            return Err(UmassError::TreeUnavailable(reason.clone()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);

        let mut session =
            RecordSession::new(self.records.clone()).with_counter(self.fetches.clone());
        if let Some((index, status)) = self.fault {
            session = session.with_fault(index, status);
        }
        Ok(session)
    }
}
