//! P100S axis driver state machine.
//!
//! Disabled → EnabledIdle → {Jogging, Moving} → EnabledIdle, with
//! EmergencyStopped reachable from anywhere and leavable only through
//! environment re-initialization followed by enable.
//!
//! All motion goes through the virtual digital input register. The drive
//! acts on rising edges only, so every trigger or jog start writes the
//! all-zero mask first and the meaningful mask second.

use crate::error::DriveError;
use crate::gear::split_revolutions;
use crate::motor::{EstopReport, Motor};
use crate::registers::{self as reg, VirtualInput};
use servox_bus::{BusError, RegisterAccessor};
use servox_common::config::{GearRatioConfig, TimingConfig};
use servox_common::consts::RPM_MAX;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Jog direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogDirection {
    /// Positive revolution direction.
    Positive,
    /// Negative revolution direction.
    Negative,
}

/// Logical state of one axis, tracked by its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    /// Output stage off.
    Disabled,
    /// Enabled, holding position, no motion commanded.
    Idle,
    /// Continuous speed-controlled motion.
    Jogging(JogDirection),
    /// Internal position move in flight.
    Moving,
    /// Latched by an emergency stop; only `init_environment` leaves this.
    EmergencyStopped,
}

/// Settle/poll/brake budgets for one axis.
///
/// Built from [`TimingConfig`]; tests shrink these to keep poll loops
/// fast.
#[derive(Debug, Clone, Copy)]
pub struct DriveTiming {
    /// Delay between the move trigger and the first completion poll.
    pub move_settle: Duration,
    /// Interval between completion polls.
    pub poll_interval: Duration,
    /// Budget for a move to report in-position.
    pub move_timeout: Duration,
    /// Interval between speed polls while braking out of a jog.
    pub brake_poll_interval: Duration,
    /// Budget for the jog deceleration wait.
    pub brake_wait: Duration,
    /// Delay between deceleration and disable, letting the brake bite.
    pub brake_engage_delay: Duration,
    /// Speed below which the axis counts as decelerated, in RPM.
    pub min_brake_rpm: u16,
    /// Mechanical deceleration allowance during an emergency stop.
    pub estop_settle: Duration,
}

impl From<&TimingConfig> for DriveTiming {
    fn from(config: &TimingConfig) -> Self {
        Self {
            move_settle: Duration::from_millis(config.move_settle_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            move_timeout: Duration::from_millis(config.move_timeout_ms),
            brake_poll_interval: Duration::from_millis(config.brake_poll_interval_ms),
            brake_wait: Duration::from_millis(config.brake_wait_ms),
            brake_engage_delay: Duration::from_millis(config.brake_engage_delay_ms),
            min_brake_rpm: config.min_brake_rpm,
            estop_settle: Duration::from_millis(config.estop_settle_ms),
        }
    }
}

impl Default for DriveTiming {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

impl DriveTiming {
    /// All sleeps zeroed, move timeout kept generous. For tests against
    /// stub transports where nothing physically settles.
    pub fn immediate() -> Self {
        Self {
            move_settle: Duration::ZERO,
            poll_interval: Duration::ZERO,
            move_timeout: Duration::from_secs(1),
            brake_poll_interval: Duration::ZERO,
            brake_wait: Duration::ZERO,
            brake_engage_delay: Duration::ZERO,
            min_brake_rpm: 30,
            estop_settle: Duration::ZERO,
        }
    }
}

/// Driver for one P100S axis.
///
/// Owns the axis state: cached speeds, the stored revolution target, and
/// the logical [`DriveState`]. Mutation happens only through these
/// methods; the enable flag is deliberately *not* cached and is re-read
/// from the device wherever it matters.
pub struct P100sDrive {
    axis: u8,
    bus: RegisterAccessor,
    gear: GearRatioConfig,
    timing: DriveTiming,
    state: DriveState,
    jog_rpm: u16,
    move_rpm: u16,
    target_revolutions: f64,
}

impl P100sDrive {
    /// Bind a driver to an axis ID on the bus.
    pub fn new(axis: u8, bus: RegisterAccessor, gear: GearRatioConfig, timing: DriveTiming) -> Self {
        info!("axis {axis}: driver bound (gear {}/{}, 2^{} ppr)",
            gear.gear_numerator, gear.gear_denominator, gear.encoder_resolution_exp);
        Self {
            axis,
            bus,
            gear,
            timing,
            state: DriveState::Disabled,
            jog_rpm: 0,
            move_rpm: 0,
            target_revolutions: 0.0,
        }
    }

    /// Axis ID on the bus.
    #[inline]
    pub const fn axis(&self) -> u8 {
        self.axis
    }

    /// Current logical state.
    #[inline]
    pub const fn state(&self) -> DriveState {
        self.state
    }

    /// The stored revolution target.
    #[inline]
    pub const fn target_revolutions(&self) -> f64 {
        self.target_revolutions
    }

    /// Write the all-zero mask, then `mask`, as two separate bus writes.
    ///
    /// The drive only acts on 0→1 transitions, so the clear write is what
    /// arms the edge.
    fn pulse_virtual_input(&self, mask: VirtualInput) -> Result<(), BusError> {
        self.bus
            .write_u16(self.axis, reg::P3_VIRTUAL_INPUT, VirtualInput::empty().bits())?;
        self.bus.write_u16(self.axis, reg::P3_VIRTUAL_INPUT, mask.bits())
    }

    /// Enable the axis if the device does not already report it enabled.
    fn ensure_enabled(&mut self) -> Result<(), DriveError> {
        if self.is_enabled()? {
            if self.state == DriveState::Disabled {
                self.state = DriveState::Idle;
            }
            return Ok(());
        }
        self.enable()
    }

    /// Read a monitor status register; bit 0 carries the flag. A failed
    /// read counts as "flag clear".
    fn status_bit(&self, addr: u16) -> bool {
        match self.bus.read_u16(self.axis, addr) {
            Ok(word) => word & reg::STATUS_BIT != 0,
            Err(e) => {
                debug!("axis {}: status read [{addr:#06x}] failed: {e}", self.axis);
                false
            }
        }
    }

    /// Poll for in-position until `timeout` elapses.
    ///
    /// Exits early with [`DriveError::MoveAborted`] if the axis is
    /// observed disabled mid-poll (an external abort or fault); a failed
    /// enable read is tolerated and polling continues.
    pub fn wait_move_done(&mut self, timeout: Duration) -> Result<(), DriveError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.status_bit(reg::MON_IN_POSITION) {
                return Ok(());
            }
            if let Ok(false) = self.is_enabled() {
                warn!("axis {}: disabled while positioning, aborting", self.axis);
                self.state = DriveState::Disabled;
                return Err(DriveError::MoveAborted);
            }
            if Instant::now() >= deadline {
                return Err(DriveError::MoveTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            thread::sleep(self.timing.poll_interval);
        }
    }

    /// The ordered environment initialization sequence.
    ///
    /// Order matters: mode first, gearing and I/O routing next, encoder
    /// setup and position reset last.
    fn init_steps(&self) -> [(&'static str, u16, u16); 20] {
        let brake_delay = self.timing.brake_engage_delay.as_millis().min(u16::MAX as u128) as u16;
        [
            ("control_mode", reg::PA_CONTROL_MODE, reg::CONTROL_MODE_POSITION),
            ("command_source", reg::PA_COMMAND_SOURCE, reg::COMMAND_SOURCE_INTERNAL),
            ("gear_numerator", reg::PA_GEAR_NUMERATOR, self.gear.gear_numerator as u16),
            ("gear_denominator", reg::PA_GEAR_DENOMINATOR, self.gear.gear_denominator as u16),
            ("virtual_input_mode", reg::P3_VIRTUAL_INPUT_MODE, reg::VIRTUAL_INPUT_ENABLED),
            ("jog_source", reg::P3_JOG_SOURCE, reg::JOG_SOURCE_VIRTUAL),
            ("accel_time", reg::PA_ACCEL_MS, 100),
            ("decel_time", reg::PA_DECEL_MS, 100),
            ("s_curve_time", reg::PA_S_CURVE_MS, 20),
            ("brake_delay", reg::PA_BRAKE_DELAY_MS, brake_delay),
            ("min_brake_speed", reg::PA_MIN_BRAKE_RPM, self.timing.min_brake_rpm),
            ("do1_function", reg::P3_DO1_FUNCTION, reg::DO_FUNCTION_BRAKE),
            ("do2_function", reg::P3_DO2_FUNCTION, reg::DO_FUNCTION_IN_POSITION),
            ("di1_function", reg::P3_DI1_FUNCTION, reg::DI_FUNCTION_NONE),
            ("di2_function", reg::P3_DI2_FUNCTION, reg::DI_FUNCTION_NONE),
            ("abs_position_mode", reg::PA_ABS_POSITION_MODE, reg::ABS_POSITION_MULTITURN),
            ("encoder_type", reg::PA_ENCODER_TYPE, reg::ENCODER_TYPE_SERIAL),
            ("single_turn_zero", reg::P3_SINGLE_TURN_ZERO, 1),
            ("multiturn_reset", reg::P3_RESET_ENCODER_MULTITURN, 1),
            ("virtual_input_clear", reg::P3_VIRTUAL_INPUT, 0),
        ]
    }

    fn check_rpm(rpm: u16) -> Result<(), DriveError> {
        if rpm > RPM_MAX {
            return Err(DriveError::RpmOutOfRange { rpm });
        }
        Ok(())
    }

    fn start_jog(&mut self, direction: JogDirection) -> Result<(), DriveError> {
        if self.state == DriveState::EmergencyStopped {
            return Err(DriveError::EmergencyStopped);
        }
        if self.jog_rpm == 0 {
            return Err(DriveError::JogRpmUnset);
        }
        self.ensure_enabled()?;

        let mask = match direction {
            JogDirection::Positive => VirtualInput::JOG_MODE | VirtualInput::JOG_POSITIVE,
            JogDirection::Negative => VirtualInput::JOG_MODE | VirtualInput::JOG_NEGATIVE,
        };
        self.pulse_virtual_input(mask)?;
        self.state = DriveState::Jogging(direction);
        info!("axis {}: jog {direction:?} at {} RPM", self.axis, self.jog_rpm);
        Ok(())
    }
}

impl Motor for P100sDrive {
    fn enable(&mut self) -> Result<(), DriveError> {
        if self.state == DriveState::EmergencyStopped {
            return Err(DriveError::EmergencyStopped);
        }
        self.bus.write_u16(self.axis, reg::P3_SERVO_ENABLE, 1)?;
        if self.state == DriveState::Disabled {
            self.state = DriveState::Idle;
        }
        debug!("axis {}: enabled", self.axis);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DriveError> {
        self.bus.write_u16(self.axis, reg::P3_SERVO_ENABLE, 0)?;
        if self.state != DriveState::EmergencyStopped {
            self.state = DriveState::Disabled;
        }
        debug!("axis {}: disabled", self.axis);
        Ok(())
    }

    fn is_enabled(&mut self) -> Result<bool, DriveError> {
        let word = self.bus.read_u16(self.axis, reg::P3_SERVO_ENABLE)?;
        Ok(word != 0)
    }

    fn set_jog_rpm(&mut self, rpm: u16) -> Result<(), DriveError> {
        Self::check_rpm(rpm)?;
        self.bus.write_u16(self.axis, reg::PA_JOG_RPM, rpm)?;
        self.jog_rpm = rpm;
        Ok(())
    }

    fn jog_rpm(&self) -> u16 {
        self.jog_rpm
    }

    fn set_move_rpm(&mut self, rpm: u16) -> Result<(), DriveError> {
        Self::check_rpm(rpm)?;
        self.bus.write_u16(self.axis, reg::PA_MOVE_RPM, rpm)?;
        self.move_rpm = rpm;
        Ok(())
    }

    fn move_rpm(&self) -> u16 {
        self.move_rpm
    }

    fn start_positive_jog(&mut self) -> Result<(), DriveError> {
        self.start_jog(JogDirection::Positive)
    }

    fn start_negative_jog(&mut self) -> Result<(), DriveError> {
        self.start_jog(JogDirection::Negative)
    }

    fn stop_jog(&mut self) -> Result<(), DriveError> {
        // Phase 1: drop the direction bit, keep jog mode. The drive
        // decelerates on its configured ramp.
        self.bus
            .write_u16(self.axis, reg::P3_VIRTUAL_INPUT, VirtualInput::JOG_MODE.bits())?;

        // Phase 2: wait for the speed to fall under the brake threshold.
        // Read failures are retried, not fatal.
        let deadline = Instant::now() + self.timing.brake_wait;
        let mut decelerated = false;
        loop {
            match self.bus.read_u16(self.axis, reg::MON_SPEED_RPM) {
                Ok(rpm) if rpm < self.timing.min_brake_rpm => {
                    decelerated = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("axis {}: speed poll failed ({e}), retrying", self.axis);
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(self.timing.brake_poll_interval);
        }
        if !decelerated {
            // Best-effort stop: proceed to brake and disable anyway.
            warn!(
                "axis {}: still above {} RPM after {:?}, braking regardless",
                self.axis, self.timing.min_brake_rpm, self.timing.brake_wait
            );
        }

        // Phase 3: let the brake bite, then cut the output stage. The
        // disable write alone decides the result.
        thread::sleep(self.timing.brake_engage_delay);
        self.disable()?;
        info!("axis {}: jog stopped", self.axis);
        Ok(())
    }

    fn set_absolute_target_revolutions(&mut self, revolutions: f64) -> Result<(), DriveError> {
        if !revolutions.is_finite() {
            return Err(DriveError::TargetNotFinite);
        }
        self.target_revolutions = revolutions;
        Ok(())
    }

    fn set_relative_target_revolutions(&mut self, delta: f64) -> Result<(), DriveError> {
        if !delta.is_finite() {
            return Err(DriveError::TargetNotFinite);
        }
        // A failed position read rejects the call: with an unknown start
        // point a relative target is meaningless.
        let current = self.current_revolutions()?;
        self.target_revolutions = current + delta;
        Ok(())
    }

    fn trigger_move(&mut self) -> Result<(), DriveError> {
        if self.state == DriveState::EmergencyStopped {
            return Err(DriveError::EmergencyStopped);
        }
        let target = split_revolutions(self.target_revolutions, &self.gear);
        if !target.fits_registers() {
            return Err(DriveError::TargetOutOfRange {
                target: self.target_revolutions,
            });
        }
        self.ensure_enabled()?;

        let (multiturn, sub_pulses) = target.register_words();
        self.bus
            .write_u16(self.axis, reg::P4_TARGET_MULTITURN, multiturn)?;
        self.bus
            .write_u16(self.axis, reg::P4_TARGET_INNER_PULSE, sub_pulses)?;
        self.pulse_virtual_input(VirtualInput::TRIGGER)?;
        self.state = DriveState::Moving;
        debug!(
            "axis {}: move to {} rev ({} + {} pulses) triggered",
            self.axis, self.target_revolutions, target.multiturn, target.sub_pulses
        );

        thread::sleep(self.timing.move_settle);
        match self.wait_move_done(self.timing.move_timeout) {
            Ok(()) => {
                // Position holds are not assumed: the axis is disabled
                // once the drive confirms in-position.
                self.disable()?;
                info!("axis {}: in position at {} rev", self.axis, self.target_revolutions);
                Ok(())
            }
            Err(DriveError::MoveAborted) => Err(DriveError::MoveAborted),
            Err(e) => {
                // Timeout: leave the axis disabled all the same.
                if let Err(disable_err) = self.disable() {
                    warn!("axis {}: disable after timeout failed: {disable_err}", self.axis);
                }
                Err(e)
            }
        }
    }

    fn is_move_done(&mut self) -> bool {
        self.status_bit(reg::MON_CMD_DONE)
    }

    fn is_in_position(&mut self) -> bool {
        self.status_bit(reg::MON_IN_POSITION)
    }

    fn set_current_position_as_zero(&mut self) -> Result<(), DriveError> {
        // All three writes are attempted even if one fails; the first
        // failure is reported.
        let multiturn = self.bus.write_u16(self.axis, reg::P4_TARGET_MULTITURN, 0);
        let inner = self.bus.write_u16(self.axis, reg::P4_TARGET_INNER_PULSE, 0);
        let reset = self
            .bus
            .write_u16(self.axis, reg::P3_RESET_ENCODER_MULTITURN, 1);
        multiturn.and(inner).and(reset)?;
        info!("axis {}: current position declared zero", self.axis);
        Ok(())
    }

    fn current_revolutions(&mut self) -> Result<f64, DriveError> {
        let pulses = self.bus.read_u64(self.axis, reg::MON_POSITION_PULSE)? as i64;
        let per_rev = f64::from(self.gear.pulses_per_revolution());
        Ok(pulses as f64 / per_rev)
    }

    fn go_home(&mut self) -> Result<(), DriveError> {
        self.set_absolute_target_revolutions(0.0)?;
        self.trigger_move()
    }

    fn emergency_stop(&mut self) -> EstopReport {
        warn!("axis {}: EMERGENCY STOP", self.axis);

        let hold_engaged = self
            .bus
            .write_u16(self.axis, reg::P3_VIRTUAL_INPUT, VirtualInput::HOLD.bits())
            .map_err(|e| warn!("axis {}: hold write failed: {e}", self.axis))
            .is_ok();

        thread::sleep(self.timing.estop_settle);

        let disabled = self
            .bus
            .write_u16(self.axis, reg::P3_SERVO_ENABLE, 0)
            .map_err(|e| warn!("axis {}: disable write failed: {e}", self.axis))
            .is_ok();

        let reset_issued = self
            .bus
            .write_u16(self.axis, reg::P5_SOFT_RESET, 1)
            .map_err(|e| warn!("axis {}: soft reset write failed: {e}", self.axis))
            .is_ok();

        self.state = DriveState::EmergencyStopped;
        EstopReport {
            hold_engaged,
            disabled,
            reset_issued,
        }
    }

    fn init_environment(&mut self) -> Result<(), DriveError> {
        for (step, addr, value) in self.init_steps() {
            self.bus
                .write_u16(self.axis, addr, value)
                .map_err(|source| DriveError::InitStep { step, source })?;
        }
        // A completed initialization is the only way out of the estop
        // latch.
        self.state = DriveState::Disabled;
        info!("axis {}: environment initialized", self.axis);
        Ok(())
    }

    fn wait(&mut self, ms: u64) {
        debug!("axis {}: waiting {ms} ms", self.axis);
        thread::sleep(Duration::from_millis(ms));
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
