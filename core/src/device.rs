use serde::{Deserialize, Serialize};

/// Number of records fetched per round-trip unless configured otherwise.
pub const DEFAULT_PAGE_CAPACITY: usize = 100;

/// A bus instance in the device tree, e.g. `umass-sim3` on path 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMatch {
    pub driver: String,
    pub unit: u32,
    pub path_id: u32,
}

/// A peripheral driver instance attached under the bus on `path_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralMatch {
    pub driver: String,
    pub unit: u32,
    pub path_id: u32,
    pub target_id: u32,
    pub lun: u64,
}

/// One record of the flattened, parent-before-children tree stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    Bus(BusMatch),
    Peripheral(PeripheralMatch),
}

impl MatchResult {
    pub fn bus(driver: &str, unit: u32, path_id: u32) -> Self {
        MatchResult::Bus(BusMatch {
            driver: driver.to_string(),
            unit,
            path_id,
        })
    }

    pub fn peripheral(driver: &str, unit: u32, path_id: u32) -> Self {
        MatchResult::Peripheral(PeripheralMatch {
            driver: driver.to_string(),
            unit,
            path_id,
            target_id: 0,
            lun: 0,
        })
    }

    pub fn path_id(&self) -> u32 {
        match self {
            MatchResult::Bus(bus) => bus.path_id,
            MatchResult::Peripheral(periph) => periph.path_id,
        }
    }
}

/// Either any value or one specific value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selector<T> {
    #[default]
    Any,
    Exact(T),
}

impl<T: PartialEq> Selector<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selector::Any => true,
            Selector::Exact(wanted) => wanted == value,
        }
    }
}

/// Which record kinds an enumeration pass reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchKinds {
    #[default]
    All,
    BusesOnly,
    PeripheralsOnly,
}

/// Wildcard match request over the device tree.
///
/// A query is built fresh for every enumeration pass. Backends advance its
/// cursor as pages are handed out, so the same query value must be passed
/// back for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTreeQuery {
    pub path_id: Selector<u32>,
    pub target_id: Selector<u32>,
    pub lun: Selector<u64>,
    pub kinds: MatchKinds,
    cursor: usize,
}

impl DeviceTreeQuery {
    /// Match everything from the top of the tree.
    pub fn wildcard() -> Self {
        Self::default()
    }

    pub fn admits(&self, record: &MatchResult) -> bool {
        match record {
            MatchResult::Bus(bus) => {
                self.kinds != MatchKinds::PeripheralsOnly && self.path_id.admits(&bus.path_id)
            }
            MatchResult::Peripheral(periph) => {
                self.kinds != MatchKinds::BusesOnly
                    && self.path_id.admits(&periph.path_id)
                    && self.target_id.admits(&periph.target_id)
                    && self.lun.admits(&periph.lun)
            }
        }
    }

    /// Position in the backend's record stream where the next page starts.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn advance(&mut self, consumed: usize) {
        self.cursor += consumed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuation {
    More,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageStatus {
    Complete,
    /// Protocol-level failure with the backend's raw status code.
    Error(u32),
}

/// Fixed-capacity buffer filled by one round-trip to the tree interface.
#[derive(Debug, Clone)]
pub struct EnumerationPage {
    records: Vec<MatchResult>,
    capacity: usize,
    pub continuation: Continuation,
    pub status: PageStatus,
}

impl EnumerationPage {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            continuation: Continuation::Last,
            status: PageStatus::Complete,
        }
    }

    /// Reset before a backend refills the page.
    pub fn clear(&mut self) {
        self.records.clear();
        self.continuation = Continuation::Last;
        self.status = PageStatus::Complete;
    }

    /// Append a record, handing it back when the page is full.
    pub fn push(&mut self, record: MatchResult) -> Result<(), MatchResult> {
        if self.is_full() {
            return Err(record);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[MatchResult] {
        &self.records
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn has_more(&self) -> bool {
        self.continuation == Continuation::More
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_refuses_records_past_capacity() {
        let mut page = EnumerationPage::with_capacity(2);
        assert!(page.push(MatchResult::bus("umass-sim", 0, 1)).is_ok());
        assert!(page.push(MatchResult::peripheral("da", 0, 1)).is_ok());

        let rejected = page.push(MatchResult::peripheral("pass", 1, 1));
        assert_eq!(rejected, Err(MatchResult::peripheral("pass", 1, 1)));
        assert!(page.is_full());
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let page = EnumerationPage::with_capacity(0);
        assert_eq!(page.capacity(), 1);
    }

    #[test]
    fn test_clear_resets_flags() {
        let mut page = EnumerationPage::with_capacity(4);
        page.push(MatchResult::bus("ahcich", 0, 0)).unwrap();
        page.continuation = Continuation::More;
        page.status = PageStatus::Error(3);

        page.clear();
        assert!(page.is_empty());
        assert!(!page.has_more());
        assert_eq!(page.status, PageStatus::Complete);
    }

    #[test]
    fn test_wildcard_query_admits_everything() {
        let query = DeviceTreeQuery::wildcard();
        assert!(query.admits(&MatchResult::bus("umass-sim", 3, 2)));
        assert!(query.admits(&MatchResult::peripheral("da", 7, 2)));
        assert_eq!(query.cursor(), 0);
    }

    #[test]
    fn test_query_filters() {
        let query = DeviceTreeQuery {
            path_id: Selector::Exact(2),
            kinds: MatchKinds::PeripheralsOnly,
            ..DeviceTreeQuery::wildcard()
        };
        assert!(!query.admits(&MatchResult::bus("umass-sim", 3, 2)));
        assert!(query.admits(&MatchResult::peripheral("da", 7, 2)));
        assert!(!query.admits(&MatchResult::peripheral("da", 8, 4)));
    }
}
