//! CO2 probe reader (Modbus RTU).
//!
//! Each attempt reads the device status, then the CO2 status, then the raw
//! measurement. The raw register is read on every attempt, including ones
//! already known to be discarded, so the probe's reply sequence stays in
//! step. An attempt is accepted only when both status words are zero.
//!
//! After an accepted reading the probe needs a settling window before the
//! next productive read. The window is tracked against the monotonic clock
//! instead of blocking: reads inside it return [`SensorError::Settling`]
//! and the caller keeps the previous value.

use embedded_hal::delay::DelayNs;
use log::{debug, trace};

use crate::bus::{Register, RegisterBus};
use crate::config::SystemConfig;
use crate::error::{SensorError, ValidationFailure};
use crate::pins;

pub struct Co2Sensor {
    raw: Register,
    device_status: Register,
    co2_status: Register,
    max_attempts: u8,
    backoff_ms: u32,
    settle_ms: u32,
    settle_until_ms: Option<u64>,
    last_ppm: f32,
}

impl Co2Sensor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            raw: Register::new(pins::CO2_UNIT, pins::CO2_REG_RAW),
            device_status: Register::new(pins::CO2_UNIT, pins::CO2_REG_DEVICE_STATUS),
            co2_status: Register::new(pins::CO2_UNIT, pins::CO2_REG_CO2_STATUS),
            max_attempts: config.co2_max_attempts.max(1),
            backoff_ms: config.co2_retry_backoff_ms,
            settle_ms: config.co2_settle_ms,
            settle_until_ms: None,
            last_ppm: 0.0,
        }
    }

    /// Last accepted concentration (ppm). Unchanged by failed reads.
    pub fn last_ppm(&self) -> f32 {
        self.last_ppm
    }

    /// True while the post-acceptance settling window is open.
    pub fn is_settling(&self, now_ms: u64) -> bool {
        self.settle_until_ms.is_some_and(|until| now_ms < until)
    }

    /// Acquire a new concentration with bounded retries.
    pub fn read(
        &mut self,
        bus: &mut impl RegisterBus,
        delay: &mut impl DelayNs,
        now_ms: u64,
    ) -> Result<f32, SensorError> {
        if self.is_settling(now_ms) {
            return Err(SensorError::Settling);
        }

        let mut last_err = SensorError::Settling;
        for attempt in 1..=self.max_attempts {
            match self.attempt(bus) {
                Ok(raw) => {
                    let ppm = f32::from(raw);
                    debug!("CO2: accepted {:.0} ppm (attempt {})", ppm, attempt);
                    self.last_ppm = ppm;
                    self.settle_until_ms = Some(now_ms + u64::from(self.settle_ms));
                    return Ok(ppm);
                }
                Err(e) => {
                    trace!("CO2: attempt {} discarded: {}", attempt, e);
                    last_err = e;
                }
            }
            if attempt < self.max_attempts {
                delay.delay_ms(self.backoff_ms);
            }
        }
        Err(last_err)
    }

    fn attempt(&mut self, bus: &mut impl RegisterBus) -> Result<u16, SensorError> {
        let device = bus.read_register(self.device_status);
        let co2 = bus.read_register(self.co2_status);
        let raw = bus.read_register(self.raw);

        match device? {
            0 => {}
            s => return Err(ValidationFailure::DeviceStatus(s).into()),
        }
        match co2? {
            0 => {}
            s => return Err(ValidationFailure::MeasurementStatus(s).into()),
        }
        Ok(raw?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::collections::{HashMap, VecDeque};

    /// Per-register reply scripts; an exhausted script repeats its last reply.
    #[derive(Default)]
    struct FakeBus {
        replies: HashMap<u16, VecDeque<Result<u16, TransportError>>>,
        reads: Vec<u16>,
    }

    impl FakeBus {
        fn script(mut self, address: u16, values: &[Result<u16, TransportError>]) -> Self {
            self.replies.insert(address, values.iter().copied().collect());
            self
        }
    }

    impl RegisterBus for FakeBus {
        fn read_register(&mut self, reg: Register) -> Result<u16, TransportError> {
            self.reads.push(reg.address);
            let q = self.replies.get_mut(&reg.address).ok_or(TransportError::NoDevice)?;
            if q.len() > 1 { q.pop_front().unwrap() } else { *q.front().unwrap() }
        }

        fn write_register(&mut self, _reg: Register, _value: u16) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += ms;
        }
    }

    fn sensor() -> Co2Sensor {
        Co2Sensor::new(&SystemConfig::default())
    }

    #[test]
    fn accepts_first_clean_attempt() {
        let mut bus = FakeBus::default()
            .script(pins::CO2_REG_DEVICE_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_CO2_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_RAW, &[Ok(850)]);
        let mut delay = CountingDelay::default();
        let mut s = sensor();

        assert_eq!(s.read(&mut bus, &mut delay, 0), Ok(850.0));
        assert_eq!(
            bus.reads,
            vec![pins::CO2_REG_DEVICE_STATUS, pins::CO2_REG_CO2_STATUS, pins::CO2_REG_RAW]
        );
        assert_eq!(delay.total_ms, 0);
    }

    #[test]
    fn raw_register_is_drained_on_discarded_attempts() {
        let mut bus = FakeBus::default()
            .script(pins::CO2_REG_DEVICE_STATUS, &[Ok(4), Ok(0)])
            .script(pins::CO2_REG_CO2_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_RAW, &[Ok(9999), Ok(700)]);
        let mut delay = CountingDelay::default();
        let mut s = sensor();

        assert_eq!(s.read(&mut bus, &mut delay, 0), Ok(700.0));
        let raw_reads = bus.reads.iter().filter(|&&a| a == pins::CO2_REG_RAW).count();
        assert_eq!(raw_reads, 2);
        assert_eq!(delay.total_ms, 10);
    }

    #[test]
    fn exhaustion_keeps_previous_value() {
        let mut good = FakeBus::default()
            .script(pins::CO2_REG_DEVICE_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_CO2_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_RAW, &[Ok(640)]);
        let mut delay = CountingDelay::default();
        let mut s = sensor();
        s.read(&mut good, &mut delay, 0).unwrap();

        let mut bad = FakeBus::default()
            .script(pins::CO2_REG_DEVICE_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_CO2_STATUS, &[Ok(2)])
            .script(pins::CO2_REG_RAW, &[Ok(100)]);
        let err = s.read(&mut bad, &mut delay, 10_000).unwrap_err();
        assert_eq!(err, SensorError::Validation(ValidationFailure::MeasurementStatus(2)));
        assert_eq!(s.last_ppm(), 640.0);
        // 10 attempts, 9 backoffs of 10 ms.
        assert_eq!(delay.total_ms, 90);
    }

    #[test]
    fn settling_window_blocks_reads_without_touching_the_bus() {
        let mut bus = FakeBus::default()
            .script(pins::CO2_REG_DEVICE_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_CO2_STATUS, &[Ok(0)])
            .script(pins::CO2_REG_RAW, &[Ok(800), Ok(820)]);
        let mut delay = CountingDelay::default();
        let mut s = sensor();

        assert_eq!(s.read(&mut bus, &mut delay, 1_000), Ok(800.0));
        let reads_after_first = bus.reads.len();
        assert_eq!(s.read(&mut bus, &mut delay, 3_999), Err(SensorError::Settling));
        assert_eq!(bus.reads.len(), reads_after_first);
        assert_eq!(s.read(&mut bus, &mut delay, 4_000), Ok(820.0));
    }

    #[test]
    fn missing_device_is_a_transport_failure() {
        let mut bus = FakeBus::default();
        let mut delay = CountingDelay::default();
        let mut s = sensor();
        assert_eq!(
            s.read(&mut bus, &mut delay, 0),
            Err(SensorError::Transport(TransportError::NoDevice))
        );
    }
}
