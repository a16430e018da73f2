// Resolves a mass-storage bus unit to the peripheral instantiated under it

use crate::tree::{DeviceTree, TreeSession};
use log::{debug, warn};
use umass_core::{
    DeviceTreeQuery, EnumerationPage, MatchResult, PageStatus, UmassError, DEFAULT_PAGE_CAPACITY,
};

/// Drives a session page by page until the stream ends or the caller stops
/// asking.
///
/// The page buffer is allocated once and refilled for every round-trip, so
/// this hands out borrowed pages rather than implementing `Iterator`.
pub struct PageStream<S: TreeSession> {
    session: S,
    query: DeviceTreeQuery,
    page: EnumerationPage,
    done: bool,
}

impl<S: TreeSession> PageStream<S> {
    pub fn new(session: S, query: DeviceTreeQuery, capacity: usize) -> Self {
        Self {
            session,
            query,
            page: EnumerationPage::with_capacity(capacity),
            done: false,
        }
    }

    pub fn next_page(&mut self) -> Option<Result<&EnumerationPage, UmassError>> {
        if self.done {
            return None;
        }

        if let Err(e) = self.session.fetch(&mut self.query, &mut self.page) {
            self.done = true;
            return Some(Err(match e {
                UmassError::Io(io) => UmassError::EnumerationFailed {
                    status: io.raw_os_error().unwrap_or(0) as u32,
                },
                other => other,
            }));
        }

        if let PageStatus::Error(status) = self.page.status {
            warn!("device tree query failed with status {:#x}", status);
            self.done = true;
            return Some(Err(UmassError::EnumerationFailed { status }));
        }

        self.done = !(self.page.has_more() && self.session.has_more());
        Some(Ok(&self.page))
    }
}

enum Scan {
    Continue,
    Found(u32),
    BusEnded,
}

/// Per-call matching state. Kept local so repeated calls are independent.
struct BusScan<'a> {
    bus_driver: &'a str,
    bus_unit: u32,
    peripheral_driver: &'a str,
    matched_path: Option<u32>,
}

impl<'a> BusScan<'a> {
    fn feed(&mut self, records: &[MatchResult]) -> Scan {
        for record in records {
            match record {
                MatchResult::Bus(bus) => {
                    if let Some(path) = self.matched_path {
                        if bus.path_id != path {
                            return Scan::BusEnded;
                        }
                        continue;
                    }
                    if bus.driver == self.bus_driver && bus.unit == self.bus_unit {
                        debug!(
                            "matched bus {}{} on path {}",
                            bus.driver, bus.unit, bus.path_id
                        );
                        self.matched_path = Some(bus.path_id);
                    }
                }
                MatchResult::Peripheral(periph) => {
                    if self.matched_path == Some(periph.path_id)
                        && periph.driver == self.peripheral_driver
                    {
                        return Scan::Found(periph.unit);
                    }
                }
            }
        }
        Scan::Continue
    }
}

/// Finds which peripheral a bus instance created.
///
/// Matching is first-match in tree order: when several peripherals of the
/// requested driver hang off the same bus, only the first is reported.
pub struct DeviceTreeMatcher<T: DeviceTree> {
    tree: T,
    page_capacity: usize,
}

impl<T: DeviceTree> DeviceTreeMatcher<T> {
    pub fn new(tree: T) -> Self {
        Self {
            tree,
            page_capacity: DEFAULT_PAGE_CAPACITY,
        }
    }

    pub fn with_page_capacity(mut self, capacity: usize) -> Self {
        self.page_capacity = capacity.max(1);
        self
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Unit number of the first `peripheral_driver` instance attached under
    /// bus `bus_driver`/`bus_unit`, or `None` if there is none.
    pub fn resolve_peripheral(
        &self,
        bus_driver: &str,
        bus_unit: u32,
        peripheral_driver: &str,
    ) -> Result<Option<u32>, UmassError> {
        if bus_driver.is_empty() || peripheral_driver.is_empty() {
            return Err(UmassError::InvalidInput(
                "driver names must not be empty".to_string(),
            ));
        }
        let session = self.tree.open()?;
        let mut pages = PageStream::new(session, DeviceTreeQuery::wildcard(), self.page_capacity);
        let mut scan = BusScan {
            bus_driver,
            bus_unit,
            peripheral_driver,
            matched_path: None,
        };

        while let Some(page) = pages.next_page() {
            match scan.feed(page?.records()) {
                Scan::Continue => {}
                Scan::Found(unit) => {
                    debug!(
                        "{}{} maps to {}{}",
                        bus_driver, bus_unit, peripheral_driver, unit
                    );
                    return Ok(Some(unit));
                }
                Scan::BusEnded => {
                    warn!(
                        "{}{} has no {} peripheral",
                        bus_driver, bus_unit, peripheral_driver
                    );
                    return Ok(None);
                }
            }
        }

        if scan.matched_path.is_some() {
            warn!(
                "{}{} has no {} peripheral",
                bus_driver, bus_unit, peripheral_driver
            );
        } else {
            debug!("no bus {}{} in the device tree", bus_driver, bus_unit);
        }
        Ok(None)
    }
}

/// One-shot lookup with the default page capacity.
pub fn resolve_peripheral<T: DeviceTree>(
    tree: T,
    bus_driver: &str,
    bus_unit: u32,
    peripheral_driver: &str,
) -> Result<Option<u32>, UmassError> {
    DeviceTreeMatcher::new(tree).resolve_peripheral(bus_driver, bus_unit, peripheral_driver)
}
