use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use btleplug::api::{BDAddr, Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use ericbt_domain::NUS_SERVICE_UUID;
use tokio::time;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::LinkError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Which peripheral to connect to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Address(BDAddr),
    Name(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Address(address) => write!(f, "{address}"),
            Target::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// `AA:BB:CC:DD:EE:FF` parses as an address, anything else is a name.
impl FromStr for Target {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match BDAddr::from_str(s) {
            Ok(address) => Target::Address(address),
            Err(_) => Target::Name(s.to_string()),
        })
    }
}

/// How an advertisement matched the target, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Match {
    Name,
    Service,
    Address,
}

/// Decide whether one advertisement is the target.
///
/// Name targets must see the name. An advert that also carries the UART
/// service outranks one that only has the name.
#[must_use]
pub fn match_advert(
    target: &Target,
    address: BDAddr,
    name: Option<&str>,
    services: &[Uuid],
) -> Option<Match> {
    match target {
        Target::Address(wanted) => (*wanted == address).then_some(Match::Address),
        Target::Name(wanted) => {
            if name != Some(wanted.as_str()) {
                None
            } else if services.contains(&NUS_SERVICE_UUID) {
                Some(Match::Service)
            } else {
                Some(Match::Name)
            }
        }
    }
}

pub struct Finder {
    adapter: Adapter,
}

impl Finder {
    pub async fn new() -> Result<Finder, LinkError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(LinkError::NoAdapter)?;
        Ok(Finder { adapter })
    }

    /// Scan until the target shows up or `timeout` runs out.
    pub async fn find(&self, target: &Target, timeout: Duration) -> Result<Option<Peripheral>, LinkError> {
        info!("Scanning for device {target}...");
        if let Target::Address(address) = target
            && let Some(known) = self.known(*address).await?
        {
            info!("Found device: [{address}]");
            return Ok(Some(known));
        }

        self.adapter.start_scan(ScanFilter::default()).await?;
        let found = time::timeout(timeout, self.poll(target)).await;
        if let Err(e) = self.adapter.stop_scan().await {
            debug!("stop_scan: {e}");
        }

        match found {
            Ok(result) => result.map(Some),
            Err(_) => {
                info!("Device not found.");
                Ok(None)
            }
        }
    }

    async fn known(&self, address: BDAddr) -> Result<Option<Peripheral>, LinkError> {
        let peripherals = self.adapter.peripherals().await?;
        Ok(peripherals.into_iter().find(|p| p.address() == address))
    }

    async fn poll(&self, target: &Target) -> Result<Peripheral, LinkError> {
        loop {
            let mut best: Option<(Match, Peripheral, Option<String>)> = None;
            for peripheral in self.adapter.peripherals().await? {
                let Some(properties) = peripheral.properties().await? else {
                    continue;
                };
                let name = properties.local_name;
                let Some(found) = match_advert(target, properties.address, name.as_deref(), &properties.services)
                else {
                    continue;
                };
                trace!("{} matched by {found:?}", properties.address);
                if best.as_ref().is_none_or(|(current, _, _)| found > *current) {
                    best = Some((found, peripheral, name));
                }
            }
            if let Some((_, peripheral, name)) = best {
                info!(
                    "Found device: {} [{}]",
                    name.as_deref().unwrap_or("<unnamed>"),
                    peripheral.address()
                );
                return Ok(peripheral);
            }
            time::sleep(POLL_INTERVAL).await;
        }
    }
}
