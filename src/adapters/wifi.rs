//! WiFi station link for the telemetry uplink.
//!
//! The uplink worker owns the [`WifiAdapter`] and calls
//! [`ConnectivityPort::poll`] before every upload. A failed join or a
//! dropped link parks the adapter in [`LinkState::Retrying`] with a
//! deadline; polls before the deadline do nothing, so the radio is only
//! touched once per backoff step.
//!
//! ```text
//!            connect ok
//!   Idle ───────────────▶ Up ◀──────────────┐
//!     │                    │ link lost      │ join ok
//!     │ connect failed     ▼                │
//!     └──────────────▶ Retrying{attempt, at_ms} ── join failed: backoff ×2
//! ```
//!
//! On ESP-IDF the link is `BlockingWifi<EspWifi>`; on the host it is a
//! simulated access point that tests switch on and off.

use core::fmt;
use log::{debug, info, warn};

use crate::adapters::time::MonotonicClock;
use crate::app::ports::Clock;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Port
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    /// `connect` before any credentials were accepted.
    MissingCredentials,
    /// SSID empty, longer than 32 bytes or not printable ASCII.
    BadSsid,
    /// WPA2 passphrase outside 8..=64 bytes.
    BadPassword,
    /// The access point did not accept us or no IP was assigned.
    JoinFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "no WiFi credentials"),
            Self::BadSsid => write!(f, "bad SSID"),
            Self::BadPassword => write!(f, "bad WPA2 passphrase"),
            Self::JoinFailed => write!(f, "could not join network"),
        }
    }
}

/// Network link as seen by the uplink.
pub trait ConnectivityPort {
    /// Join now. Joining while already up is a no-op.
    fn connect(&mut self) -> Result<(), ConnectivityError>;

    fn is_connected(&self) -> bool;

    /// Drive reconnection. Cheap when nothing is due.
    fn poll(&mut self);

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;

    /// Signal strength of the joined access point (dBm).
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Credentials and backoff
// ───────────────────────────────────────────────────────────────

/// Validated station credentials. An empty password means an open network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl Credentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        let printable = ssid.bytes().all(|b| b.is_ascii_graphic() || b == b' ');
        if ssid.is_empty() || !printable {
            return Err(ConnectivityError::BadSsid);
        }
        if !password.is_empty() && !(8..=64).contains(&password.len()) {
            return Err(ConnectivityError::BadPassword);
        }

        let mut creds = Self::default();
        creds.ssid.push_str(ssid).map_err(|_| ConnectivityError::BadSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| ConnectivityError::BadPassword)?;
        Ok(creds)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Doubling reconnect delay, reset by a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    secs: u32,
}

impl Backoff {
    pub const FIRST_SECS: u32 = 2;
    pub const CAP_SECS: u32 = 60;

    pub fn new() -> Self {
        Self { secs: Self::FIRST_SECS }
    }

    pub fn secs(self) -> u32 {
        self.secs
    }

    fn grow(&mut self) {
        self.secs = (self.secs * 2).min(Self::CAP_SECS);
    }

    fn reset(&mut self) {
        self.secs = Self::FIRST_SECS;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Up,
    /// Waiting for `at_ms` before join attempt `attempt + 1`.
    Retrying { attempt: u32, at_ms: u64 },
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    creds: Option<Credentials>,
    state: LinkState,
    backoff: Backoff,
    rssi: Option<i8>,
    clock: MonotonicClock,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimulatedAp,
}

/// Host stand-in for the access point.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy)]
struct SimulatedAp {
    reachable: bool,
    associated: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>, clock: MonotonicClock) -> Self {
        Self {
            creds: None,
            state: LinkState::Idle,
            backoff: Backoff::new(),
            rssi: None,
            clock,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(clock: MonotonicClock) -> Self {
        Self {
            creds: None,
            state: LinkState::Idle,
            backoff: Backoff::new(),
            rssi: None,
            clock,
            sim: SimulatedAp { reachable: true, associated: false },
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Simulation: switch the access point on or off. Switching it off
    /// drops an established association.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_reachable(&mut self, reachable: bool) {
        self.sim.reachable = reachable;
        if !reachable {
            self.sim.associated = false;
        }
    }

    /// Simulation: let the pending retry run on the next poll.
    #[cfg(not(target_os = "espidf"))]
    pub fn skip_backoff(&mut self) {
        if let LinkState::Retrying { attempt, .. } = self.state {
            self.state = LinkState::Retrying { attempt, at_ms: 0 };
        }
    }

    fn join(&mut self) -> Result<(), ConnectivityError> {
        let creds = self.creds.clone().ok_or(ConnectivityError::MissingCredentials)?;
        self.link_join(&creds)?;
        self.state = LinkState::Up;
        self.backoff.reset();
        self.rssi = self.link_rssi();
        info!("WiFi: joined '{}' (RSSI {:?} dBm)", creds.ssid(), self.rssi);
        Ok(())
    }

    fn retry_later(&mut self, attempt: u32) {
        let at_ms = self.clock.now_ms() + u64::from(self.backoff.secs()) * 1_000;
        debug!("WiFi: retry {} in {} s", attempt + 1, self.backoff.secs());
        self.state = LinkState::Retrying { attempt, at_ms };
        self.rssi = None;
    }

    // ── Link primitives ───────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn link_join(&mut self, creds: &Credentials) -> Result<(), ConnectivityError> {
        let client = ClientConfiguration {
            ssid: creds.ssid.as_str().try_into().map_err(|_| ConnectivityError::BadSsid)?,
            password: creds
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::BadPassword)?,
            auth_method: if creds.is_open() { AuthMethod::None } else { AuthMethod::WPA2Personal },
            ..Default::default()
        };

        let wifi = &mut self.wifi;
        let joined = wifi
            .set_configuration(&Configuration::Client(client))
            .and_then(|()| if wifi.is_started()? { Ok(()) } else { wifi.start() })
            .and_then(|()| wifi.connect())
            .and_then(|()| wifi.wait_netif_up());
        joined.map_err(|e| {
            warn!("WiFi: join '{}' failed: {:?}", creds.ssid(), e);
            ConnectivityError::JoinFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn link_join(&mut self, creds: &Credentials) -> Result<(), ConnectivityError> {
        if !self.sim.reachable {
            warn!("WiFi(sim): '{}' out of range", creds.ssid());
            return Err(ConnectivityError::JoinFailed);
        }
        self.sim.associated = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn link_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn link_up(&self) -> bool {
        self.sim.associated
    }

    #[cfg(target_os = "espidf")]
    fn link_rssi(&self) -> Option<i8> {
        use esp_idf_svc::sys::{esp_err_t, esp_wifi_sta_get_ap_info, wifi_ap_record_t, ESP_OK};
        // SAFETY: wifi_ap_record_t is plain C data; all-zero is a valid value.
        let mut record: wifi_ap_record_t = unsafe { core::mem::zeroed() };
        // SAFETY: `record` outlives the call and the driver is started.
        let ret = unsafe { esp_wifi_sta_get_ap_info(&mut record) };
        (ret == ESP_OK as esp_err_t).then_some(record.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn link_rssi(&self) -> Option<i8> {
        self.sim.associated.then_some(-60)
    }
}

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.state == LinkState::Up {
            return Ok(());
        }
        self.join().inspect_err(|_| self.retry_later(0))
    }

    fn is_connected(&self) -> bool {
        self.state == LinkState::Up && self.link_up()
    }

    fn poll(&mut self) {
        match self.state {
            LinkState::Idle => {}
            LinkState::Up if self.link_up() => self.rssi = self.link_rssi(),
            LinkState::Up => {
                warn!("WiFi: link lost");
                self.retry_later(0);
            }
            LinkState::Retrying { attempt, at_ms } => {
                if self.clock.now_ms() < at_ms {
                    return;
                }
                if self.join().is_err() {
                    self.backoff.grow();
                    self.retry_later(attempt + 1);
                }
            }
        }
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        let creds = Credentials::new(ssid, password)?;
        info!("WiFi: network '{}'{}", creds.ssid(), if creds.is_open() { " (open)" } else { "" });
        self.creds = Some(creds);
        Ok(())
    }

    fn rssi(&self) -> Option<i8> {
        self.rssi
    }
}
