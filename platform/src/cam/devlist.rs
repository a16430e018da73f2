// Parser for `camcontrol devlist -v` output
//
//   scbus2 on umass-sim0 bus 0:
//   <SanDisk Cruzer 1.26>   at scbus2 target 0 lun 0 (pass2,da0)
//
// Bus headers become `Bus` records keyed by their path id, each device line
// contributes one `Peripheral` record per peripheral driver instance.

use crate::naming::split_unit;
use log::{trace, warn};
use umass_core::{BusMatch, MatchResult, PeripheralMatch};

/// Parsed listing. `fault` holds the record index at which parsing stopped
/// and the offending (1-based) line number.
#[derive(Debug, Default)]
pub struct DevList {
    pub records: Vec<MatchResult>,
    pub fault: Option<(usize, u32)>,
}

pub fn parse_devlist(text: &str) -> DevList {
    let mut list = DevList::default();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let parsed = if line.starts_with("scbus") {
            parse_bus_line(line).map(|bus| vec![MatchResult::Bus(bus)])
        } else if line.starts_with('<') {
            parse_device_line(line)
                .map(|periphs| periphs.into_iter().map(MatchResult::Peripheral).collect())
        } else {
            None
        };

        match parsed {
            Some(records) => {
                trace!("line {}: {} records", index + 1, records.len());
                list.records.extend(records);
            }
            None => {
                warn!("unparseable device list line {}: {:?}", index + 1, line);
                list.fault = Some((list.records.len(), (index + 1) as u32));
                break;
            }
        }
    }

    list
}

/// `scbus` ids are printed signed; the transport layer's own path is -1.
fn parse_path_id(token: &str) -> Option<u32> {
    let id: i64 = token.strip_prefix("scbus")?.parse().ok()?;
    Some(id as u32)
}

fn parse_bus_line(line: &str) -> Option<BusMatch> {
    let body = line.strip_suffix(':')?;
    let mut tokens = body.split_whitespace();

    let path_id = parse_path_id(tokens.next()?)?;
    if tokens.next()? != "on" {
        return None;
    }
    let (driver, unit) = split_unit(tokens.next()?)?;

    Some(BusMatch {
        driver: driver.to_string(),
        unit,
        path_id,
    })
}

fn parse_device_line(line: &str) -> Option<Vec<PeripheralMatch>> {
    let open = line.rfind('(')?;
    let names = line[open + 1..].strip_suffix(')')?;

    let at = line[..open].rfind(" at scbus")?;
    let mut tokens = line[at..open].split_whitespace().skip(1);

    let path_id = parse_path_id(tokens.next()?)?;
    if tokens.next()? != "target" {
        return None;
    }
    let target_id = tokens.next()?.parse::<i64>().ok()? as u32;
    if tokens.next()? != "lun" {
        return None;
    }
    let lun = u64::from_str_radix(tokens.next()?, 16).ok()?;

    let mut periphs = Vec::new();
    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let (driver, unit) = split_unit(name)?;
        periphs.push(PeripheralMatch {
            driver: driver.to_string(),
            unit,
            path_id,
            target_id,
            lun,
        });
    }
    Some(periphs)
}
