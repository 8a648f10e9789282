//! Software-emulated P100S drives.
//!
//! `SimTransport` implements [`RegisterTransport`] over an in-memory
//! register space per axis, with just enough device behavior for
//! development and testing without hardware: trigger-edge position moves,
//! a short in-position reporting delay, jog speed with a staged ramp-down,
//! and the multiturn reset. Per-register fault injection covers the
//! partial-failure paths.

use crate::registers as reg;
use servox_bus::{BusError, RegionKind, RegisterBlock, RegisterTransport};
use servox_common::config::GearRatioConfig;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// How many status reads a simulated move stays "not yet in position".
const COIN_REPORT_DELAY_READS: u8 = 2;
/// How many speed reads a simulated jog takes to ramp down to zero.
const JOG_DECEL_READS: u8 = 2;

/// One emulated axis.
struct SimAxis {
    gear: GearRatioConfig,
    /// Parameter registers, mirrored back on reads.
    params: HashMap<u16, u16>,
    /// Encoder position in pulses.
    position_pulses: i64,
    /// Reported speed in RPM.
    speed_rpm: u16,
    /// Reads left before COIN/CMDOK report set.
    coin_delay_reads: u8,
    /// Reads left in the jog ramp-down.
    decel_reads: u8,
    /// Previous virtual-input mask, for edge detection.
    last_vdi: u16,
}

impl SimAxis {
    fn new(gear: GearRatioConfig) -> Self {
        Self {
            gear,
            params: HashMap::new(),
            position_pulses: 0,
            speed_rpm: 0,
            coin_delay_reads: 0,
            decel_reads: 0,
            last_vdi: 0,
        }
    }

    fn enabled(&self) -> bool {
        self.params
            .get(&reg::P3_SERVO_ENABLE)
            .copied()
            .unwrap_or(0)
            != 0
    }

    fn param_i16(&self, addr: u16) -> i16 {
        self.params.get(&addr).copied().unwrap_or(0) as i16
    }

    /// Encoder pulse target from the two position registers.
    fn target_pulses(&self) -> i64 {
        let multiturn = i64::from(self.param_i16(reg::P4_TARGET_MULTITURN));
        let sub_command = f64::from(self.param_i16(reg::P4_TARGET_INNER_PULSE));
        let ppr = i64::from(self.gear.pulses_per_revolution());
        // Command pulses scale to encoder pulses by the electronic gear.
        let sub_encoder = (sub_command * f64::from(self.gear.gear_numerator)
            / f64::from(self.gear.gear_denominator))
        .round() as i64;
        multiturn * ppr + sub_encoder
    }

    fn write(&mut self, addr: u16, value: u16) {
        match addr {
            reg::P3_VIRTUAL_INPUT => {
                let rising = value & !self.last_vdi;
                let trigger = reg::VirtualInput::TRIGGER.bits();
                let jog_mode = reg::VirtualInput::JOG_MODE.bits();
                let jog_dirs = (reg::VirtualInput::JOG_POSITIVE
                    | reg::VirtualInput::JOG_NEGATIVE)
                    .bits();
                let hold = reg::VirtualInput::HOLD.bits();

                if rising & trigger != 0 && self.enabled() {
                    // Instant physics; the in-position report lags a few
                    // reads so pollers see the move "in flight".
                    self.position_pulses = self.target_pulses();
                    self.coin_delay_reads = COIN_REPORT_DELAY_READS;
                    debug!("sim: move to {} pulses", self.position_pulses);
                }
                if rising & jog_dirs != 0 && value & jog_mode != 0 && self.enabled() {
                    self.speed_rpm = self
                        .params
                        .get(&reg::PA_JOG_RPM)
                        .copied()
                        .unwrap_or(0);
                    self.decel_reads = 0;
                }
                if value & jog_mode != 0
                    && value & jog_dirs == 0
                    && self.last_vdi & jog_dirs != 0
                {
                    // Direction dropped: ramp down over a few speed reads.
                    self.decel_reads = JOG_DECEL_READS;
                }
                if rising & hold != 0 {
                    self.speed_rpm = 0;
                }
                self.last_vdi = value;
                self.params.insert(addr, value);
            }
            reg::P3_RESET_ENCODER_MULTITURN if value != 0 => {
                self.position_pulses = 0;
                self.params.insert(addr, value);
            }
            reg::P3_SERVO_ENABLE => {
                if value == 0 {
                    self.speed_rpm = 0;
                }
                self.params.insert(addr, value);
            }
            _ => {
                self.params.insert(addr, value);
            }
        }
    }

    fn read(&mut self, addr: u16) -> u16 {
        match addr {
            reg::MON_CMD_DONE | reg::MON_IN_POSITION => {
                if self.coin_delay_reads > 0 {
                    self.coin_delay_reads -= 1;
                    0
                } else {
                    reg::STATUS_BIT
                }
            }
            reg::MON_SPEED_RPM => {
                if self.decel_reads > 0 {
                    self.decel_reads -= 1;
                    if self.decel_reads == 0 {
                        self.speed_rpm = 0;
                    }
                }
                self.speed_rpm
            }
            a if (reg::MON_POSITION_PULSE..reg::MON_POSITION_PULSE + 4).contains(&a) => {
                let shift = 16 * (a - reg::MON_POSITION_PULSE);
                ((self.position_pulses as u64) >> shift) as u16
            }
            _ => self.params.get(&addr).copied().unwrap_or(0),
        }
    }
}

/// In-memory register transport emulating P100S drives.
pub struct SimTransport {
    open: bool,
    axes: BTreeMap<u8, SimAxis>,
    fail_reads: HashSet<(u8, u16)>,
    fail_writes: HashSet<(u8, u16)>,
}

impl SimTransport {
    /// Empty bus with no axes.
    pub fn new() -> Self {
        Self {
            open: false,
            axes: BTreeMap::new(),
            fail_reads: HashSet::new(),
            fail_writes: HashSet::new(),
        }
    }

    /// Builder-style axis registration.
    pub fn with_axis(mut self, id: u8, gear: GearRatioConfig) -> Self {
        self.add_axis(id, gear);
        self
    }

    /// Register an axis on the simulated bus.
    pub fn add_axis(&mut self, id: u8, gear: GearRatioConfig) {
        self.axes.insert(id, SimAxis::new(gear));
    }

    /// Make every read of `addr` on `axis` fail until cleared.
    pub fn fail_read(&mut self, axis: u8, addr: u16) {
        self.fail_reads.insert((axis, addr));
    }

    /// Make every write to `addr` on `axis` fail until cleared.
    pub fn fail_write(&mut self, axis: u8, addr: u16) {
        self.fail_writes.insert((axis, addr));
    }

    /// Clear all injected faults.
    pub fn clear_faults(&mut self) {
        self.fail_reads.clear();
        self.fail_writes.clear();
    }

    /// Current encoder position of an axis, for test inspection.
    pub fn position_pulses(&self, axis: u8) -> Option<i64> {
        self.axes.get(&axis).map(|a| a.position_pulses)
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterTransport for SimTransport {
    fn open(&mut self, identifier: &str) -> Result<(), BusError> {
        debug!("sim: open {identifier}");
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_registers(
        &mut self,
        axis: u8,
        _region: RegionKind,
        start: u16,
        end: u16,
    ) -> Result<RegisterBlock, BusError> {
        if !self.open {
            return Err(BusError::NotOpen);
        }
        for addr in start..=end {
            if self.fail_reads.contains(&(axis, addr)) {
                return Err(BusError::Io(format!("injected read fault at {addr:#06x}")));
            }
        }
        // An absent device never answers.
        let sim = self.axes.get_mut(&axis).ok_or(BusError::Timeout)?;
        let words = (start..=end).map(|addr| sim.read(addr)).collect();
        Ok(RegisterBlock::new(words))
    }

    fn write_registers(
        &mut self,
        axis: u8,
        _region: RegionKind,
        start: u16,
        values: &[u16],
    ) -> Result<(), BusError> {
        if !self.open {
            return Err(BusError::NotOpen);
        }
        if self.fail_writes.contains(&(axis, start)) {
            return Err(BusError::Io(format!("injected write fault at {start:#06x}")));
        }
        let sim = self.axes.get_mut(&axis).ok_or(BusError::Timeout)?;
        for (i, &value) in values.iter().enumerate() {
            sim.write(start + i as u16, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_sim() -> SimTransport {
        let mut sim = SimTransport::new().with_axis(1, GearRatioConfig::default());
        sim.open("sim").unwrap();
        sim
    }

    fn write_one(sim: &mut SimTransport, addr: u16, value: u16) {
        sim.write_registers(1, RegionKind::Holding, addr, &[value])
            .unwrap();
    }

    fn read_one(sim: &mut SimTransport, addr: u16) -> u16 {
        sim.read_registers(1, RegionKind::Input, addr, addr)
            .unwrap()
            .word(0)
            .unwrap()
    }

    #[test]
    fn parameters_mirror_back_on_read() {
        let mut sim = open_sim();
        write_one(&mut sim, reg::PA_JOG_RPM, 800);
        assert_eq!(read_one(&mut sim, reg::PA_JOG_RPM), 800);
    }

    #[test]
    fn trigger_edge_moves_and_reports_after_delay() {
        let mut sim = open_sim();
        write_one(&mut sim, reg::P3_SERVO_ENABLE, 1);
        write_one(&mut sim, reg::P4_TARGET_MULTITURN, 2);
        write_one(&mut sim, reg::P4_TARGET_INNER_PULSE, 5400); // half a turn
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, 0);
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, reg::VirtualInput::TRIGGER.bits());

        let ppr = i64::from(GearRatioConfig::default().pulses_per_revolution());
        assert_eq!(sim.position_pulses(1), Some(2 * ppr + ppr / 2));

        // COIN lags a couple of reads so pollers see the move in flight.
        assert_eq!(read_one(&mut sim, reg::MON_IN_POSITION), 0);
        assert_eq!(read_one(&mut sim, reg::MON_IN_POSITION), 0);
        assert_eq!(read_one(&mut sim, reg::MON_IN_POSITION), reg::STATUS_BIT);
    }

    #[test]
    fn trigger_without_enable_does_nothing() {
        let mut sim = open_sim();
        write_one(&mut sim, reg::P4_TARGET_MULTITURN, 2);
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, 0);
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, reg::VirtualInput::TRIGGER.bits());
        assert_eq!(sim.position_pulses(1), Some(0));
    }

    #[test]
    fn jog_sets_speed_and_ramps_down_when_direction_drops() {
        let mut sim = open_sim();
        write_one(&mut sim, reg::P3_SERVO_ENABLE, 1);
        write_one(&mut sim, reg::PA_JOG_RPM, 600);
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, 0);
        let mask = (reg::VirtualInput::JOG_MODE | reg::VirtualInput::JOG_POSITIVE).bits();
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, mask);
        assert_eq!(read_one(&mut sim, reg::MON_SPEED_RPM), 600);

        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, reg::VirtualInput::JOG_MODE.bits());
        assert_eq!(read_one(&mut sim, reg::MON_SPEED_RPM), 600);
        assert_eq!(read_one(&mut sim, reg::MON_SPEED_RPM), 0);
    }

    #[test]
    fn multiturn_reset_zeroes_position() {
        let mut sim = open_sim();
        write_one(&mut sim, reg::P3_SERVO_ENABLE, 1);
        write_one(&mut sim, reg::P4_TARGET_MULTITURN, 3);
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, 0);
        write_one(&mut sim, reg::P3_VIRTUAL_INPUT, reg::VirtualInput::TRIGGER.bits());
        assert_ne!(sim.position_pulses(1), Some(0));

        write_one(&mut sim, reg::P3_RESET_ENCODER_MULTITURN, 1);
        assert_eq!(sim.position_pulses(1), Some(0));
    }

    #[test]
    fn unknown_axis_times_out() {
        let mut sim = open_sim();
        let result = sim.read_registers(9, RegionKind::Input, 0x0001, 0x0001);
        assert!(matches!(result, Err(BusError::Timeout)));
    }

    #[test]
    fn closed_transport_refuses_traffic() {
        let mut sim = SimTransport::new().with_axis(1, GearRatioConfig::default());
        let result = sim.read_registers(1, RegionKind::Input, 0x0001, 0x0001);
        assert!(matches!(result, Err(BusError::NotOpen)));
    }
}
