//! The controller: one owned context for the whole device.
//!
//! Interrupt handlers call the event entry points (`adc_result`,
//! `audio_sample`, `audio_tick`, `home_edge` and the [`SlaveEvents`]
//! bus callbacks); the main loop calls [`Controller::poll`]. Entry points
//! only do O(1) work and hand anything heavier to `poll` through
//! [`Flags`]. On hardware every call runs inside the same critical
//! section, so each event is atomic with respect to the others.

use crate::analog::{supply_millivolts, AnalogSampler, Channel, Readings};
use crate::audio::{AudioPipeline, AudioRing};
use crate::bus::BusEngine;
use crate::command::Command;
use crate::config::{
    BATTERY_CHECK_SAMPLES, CRITICAL_FLASH_COUNT, CRITICAL_FLASH_MS, DEFAULT_BRIGHTNESS,
    DEFAULT_VOLUME, RPI_POWERDOWN_THRESHOLD,
};
use crate::error::{Error, ErrorCode};
use crate::flags::Flags;
use crate::hal::{Ack, Board, ResetReason, SlaveEvents};
use crate::indicator::Color;
use crate::persist::PersistentState;
use crate::power::{PowerMachine, Transition};
use crate::rumbler::Rumbler;
use crate::safety::{self, BatteryGuard};
use crate::state::{DeviceState, Mode};
use embedded_hal::delay::DelayNs;

/// Length of the `Info` reply.
pub const INFO_SIZE: usize = 21;

pub struct Controller<'a, B: Board> {
    board: B,
    flags: &'a Flags,
    state: DeviceState,
    power: PowerMachine,
    bus: BusEngine,
    audio: AudioPipeline,
    sampler: AnalogSampler,
    battery: BatteryGuard,
    rumbler: Rumbler,
    volume: u8,
    /// Host-driven LED state while `On`.
    rgb: Option<Color>,
    rgb_color: Color,
    /// Last level reported by the home button edge handler.
    home: bool,
    /// Host notification requested by the current entry point.
    notify: bool,
}

impl<'a, B: Board> Controller<'a, B> {
    pub fn new(board: B, flags: &'a Flags) -> Self {
        let mut state = DeviceState::default();
        state.info.brightness = DEFAULT_BRIGHTNESS;
        let sampler = AnalogSampler::new(board.temp_calibration());
        Self {
            board,
            flags,
            state,
            power: PowerMachine::new(),
            bus: BusEngine::new(),
            audio: AudioPipeline::new(),
            sampler,
            battery: BatteryGuard::new(),
            rumbler: Rumbler::new(),
            volume: DEFAULT_VOLUME,
            rgb: None,
            rgb_color: Color::WHITE,
            home: false,
            notify: false,
        }
    }

    /// Record why we reset, then power the host unless the battery is too low.
    pub fn boot(&mut self) {
        let reason = self.board.reset_reason();
        self.state.info.error = match reason {
            ResetReason::Watchdog => ErrorCode::WatchdogTimeout,
            ResetReason::PowerOn => ErrorCode::InitialPowerOn,
            ResetReason::Software | ResetReason::Other => ErrorCode::NoError,
        };
        info!("Boot: reset reason {:?}, error {:?}", reason, self.state.info.error);
        self.sampler.restart();
        self.enter(Mode::Sleep);
        if self.battery_check() {
            self.enter(Mode::PowerUp);
        }
        self.raise_notification(false);
    }

    // Accessors

    pub fn mode(&self) -> Mode {
        self.power.mode()
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn audio_ring(&self) -> &AudioRing {
        &self.audio.ring
    }

    pub fn is_recording(&self) -> bool {
        self.audio.is_recording()
    }

    pub fn battery_critical(&self) -> bool {
        self.battery.is_critical()
    }

    /// Channel the sampler expects the next conversion from.
    pub fn sampler_channel(&self) -> Channel {
        self.sampler.channel()
    }

    pub fn persistent_state(&self) -> PersistentState {
        PersistentState {
            alarm: self.state.info.alarm,
            brightness: self.state.info.brightness,
            volume: self.volume,
        }
    }

    /// Apply state loaded from flash at startup. Does not mark it dirty.
    pub fn restore_persistent(&mut self, p: PersistentState) {
        self.apply_persistent(p);
    }

    // Interrupt entry points

    /// Conversion result for [`sampler_channel`](Self::sampler_channel).
    pub fn adc_result(&mut self, raw: u16) {
        if let Some(readings) = self.sampler.record(raw) {
            self.on_tick(readings);
        }
        if core::mem::take(&mut self.notify) {
            self.flags.set(Flags::IRQ_PENDING);
        }
    }

    /// Free-running microphone conversion.
    pub fn audio_sample(&mut self, raw: u8) {
        self.audio.sample(raw);
    }

    /// 8 kHz sample timer.
    pub fn audio_tick(&mut self) {
        if self.audio.tick() {
            self.flags.set(Flags::AUDIO_BATCH_VALID);
        }
    }

    /// Home button edge.
    pub fn home_edge(&mut self, pressed: bool) {
        self.home = pressed;
        self.flags.set(Flags::HOME_CHANGED);
    }

    /// One-second real-time tick.
    pub fn second_tick(&self) {
        self.flags.set(Flags::SECOND_TICK);
    }

    /// Serve a whole read for peripherals that clock out a buffer: fills
    /// `buf` with the read window. Finish with [`bus_read_done`](Self::bus_read_done).
    pub fn bus_read(&mut self, buf: &mut [u8]) {
        self.start_transmit();
        self.bus.peek(buf);
    }

    pub fn bus_read_done(&mut self, sent: usize) {
        self.bus.mark_sent(sent);
        self.stop_transmit();
    }

    // Main loop

    /// Run deferred work: pending command, second tick, home button,
    /// critical battery, then raise the host interrupt if anything asked.
    pub fn poll(&mut self) {
        if self.flags.any(Flags::COMMAND_READY) {
            let decoded = Command::decode(self.bus.command());
            self.flags.clear(Flags::COMMAND_READY);
            if let Err(e) = decoded.and_then(|cmd| self.execute(cmd)) {
                warn!("Command rejected: {:?}", e);
            }
        }
        if self.flags.take(Flags::SECOND_TICK) {
            self.on_second();
        }
        if self.flags.take(Flags::HOME_CHANGED) {
            self.on_home();
        }
        if self.flags.take(Flags::BATTERY_CRITICAL) {
            if let Some(t) = self.power.battery_critical() {
                warn!("Battery critical, powering down");
                self.apply(t);
            }
        }
        let batch = self.flags.take(Flags::AUDIO_BATCH_VALID);
        self.raise_notification(batch);
    }

    fn execute(&mut self, cmd: Command) -> Result<(), Error> {
        debug!("Command: {:?}", cmd);
        match cmd {
            Command::Nop => {}
            Command::Reset => {
                info!("Reset requested by host");
                self.board.reset();
            }
            Command::Info => {
                let reply = self.info_reply();
                self.bus.redirect_to_reply(&reply);
            }
            Command::StartAudioRecording => {
                self.require(Mode::On)?;
                self.start_recording();
            }
            Command::StopAudioRecording => self.stop_recording(),
            Command::SetBrightness(level) => {
                self.set_brightness(level);
                self.flags.set(Flags::PERSIST_DIRTY);
            }
            Command::SetTime(time) => self.state.info.time = time,
            Command::GetPersistentState => {
                let image = self.persistent_state().to_bytes();
                self.bus.redirect_to_reply(&image);
            }
            Command::SetPersistentState(p) => {
                self.apply_persistent(p);
                self.flags.set(Flags::PERSIST_DIRTY);
            }
            Command::RumblerOk => {
                self.require(Mode::On)?;
                let duty = self.rumbler.ok();
                self.board.set_rumbler(duty);
            }
            Command::RumblerFail => {
                self.require(Mode::On)?;
                let duty = self.rumbler.fail();
                self.board.set_rumbler(duty);
            }
            Command::Rumbler { intensity, duration } => {
                self.require(Mode::On)?;
                let duty = self.rumbler.custom(intensity, duration);
                self.board.set_rumbler(duty);
            }
            Command::RgbOn => {
                self.require(Mode::On)?;
                self.rgb = Some(self.rgb_color);
                self.board.set_rgb(self.rgb);
            }
            Command::RgbOff => {
                self.rgb = None;
                self.board.set_rgb(None);
            }
            Command::RgbColor(color) => {
                self.rgb_color = color;
                if self.rgb.is_some() {
                    self.rgb = Some(color);
                    self.board.set_rgb(self.rgb);
                }
            }
            Command::PowerOn => {
                if self.mode() != Mode::On {
                    let t = self.power.power_on_requested().ok_or(Error::NotAllowed)?;
                    self.apply(t);
                }
            }
            Command::PowerDown => {
                let t = self.power.power_down_requested().ok_or(Error::NotAllowed)?;
                self.apply(t);
            }
            Command::ClearError => {
                self.state.info.error = ErrorCode::NoError;
                self.board.set_rgb(self.rgb);
            }
            Command::SetAlarm(alarm) => {
                self.state.info.alarm = alarm;
                self.state.status.alarm = false;
                self.flags.set(Flags::PERSIST_DIRTY);
            }
        }
        Ok(())
    }

    fn require(&self, mode: Mode) -> Result<(), Error> {
        if self.mode() == mode {
            Ok(())
        } else {
            Err(Error::NotAllowed)
        }
    }

    fn info_reply(&self) -> [u8; INFO_SIZE] {
        let chip = self.board.chip_info();
        let mut r = [0u8; INFO_SIZE];
        r[0..3].copy_from_slice(&chip.signature);
        // 1 = application, the bootloader answers 0
        r[3] = 1;
        r[4..15].copy_from_slice(&chip.fuses);
        r[15..19].copy_from_slice(&chip.clock);
        r[19..21].copy_from_slice(&chip.page_size.to_be_bytes());
        r
    }

    fn set_brightness(&mut self, level: u8) {
        self.state.info.brightness = level;
        if self.mode() == Mode::On {
            self.board.set_backlight(level);
        }
    }

    fn apply_persistent(&mut self, p: PersistentState) {
        self.state.info.alarm = p.alarm;
        self.volume = p.volume;
        self.set_brightness(p.brightness);
    }

    // Audio

    fn start_recording(&mut self) {
        if self.audio.is_recording() {
            return;
        }
        info!("Audio: recording started");
        self.audio.start();
        self.board.start_audio();
        self.bus.redirect_to_audio();
        self.state.status.recording = true;
        self.state.status.batch_index = 0;
    }

    fn stop_recording(&mut self) {
        if !self.audio.is_recording() {
            return;
        }
        info!("Audio: recording stopped");
        self.audio.stop();
        self.board.stop_audio();
        self.bus.redirect_to_state();
        let status = &mut self.state.status;
        status.recording = false;
        status.batch_index = 0;
        status.batch_incomplete = false;
    }

    // Ticks

    fn on_tick(&mut self, r: Readings) {
        let before = (self.state.status.to_byte(), self.state.controls);

        let info = &mut self.state.info;
        info.supply_mv = r.supply_mv;
        info.battery_mv = r.battery_mv;
        info.temperature = r.temperature;
        self.state.status.power = r.power_status();
        let controls = &mut self.state.controls;
        controls.set_ladder(0, r.ladders[0]);
        controls.set_ladder(1, r.ladders[1]);
        controls.joy_h = r.joy_h;
        controls.joy_v = r.joy_v;

        if self.update_battery(r.supply_mv) {
            self.flags.set(Flags::BATTERY_CRITICAL);
        }
        let halted = self.mode() == Mode::PowerDown
            && self.board.shutdown_level() >= RPI_POWERDOWN_THRESHOLD;
        let transition = self.power.tick(self.home, halted);

        if let Some(duty) = self.rumbler.tick() {
            if self.mode().host_powered() {
                self.board.set_rumbler(duty);
            }
        }

        match transition {
            Some(t) => self.apply(t),
            None if (self.state.status.to_byte(), self.state.controls) != before => {
                self.notify_host()
            }
            None => {}
        }
    }

    fn on_second(&mut self) {
        self.board.pet_watchdog();
        if safety::second_tick(&mut self.state.info) {
            info!("Alarm fired");
            self.state.status.alarm = true;
            self.notify_host();
        }
    }

    fn on_home(&mut self) {
        let pressed = self.home;
        let changed = self.state.controls.home() != pressed;
        self.state.controls.set_home(pressed);
        if pressed && self.mode() == Mode::Sleep {
            if self.battery_check() {
                self.apply(Transition::to(Mode::WakeUp));
            }
        } else if changed {
            self.notify_host();
        }
    }

    // Battery

    fn update_battery(&mut self, supply_mv: u16) -> bool {
        let was = self.battery.is_critical();
        let critical = self.battery.update(supply_mv);
        if critical != was {
            if critical {
                warn!("Battery critical: {} mV", supply_mv);
            } else {
                info!("Battery recovered: {} mV", supply_mv);
            }
        }
        critical
    }

    /// Average a burst of supply samples; on a critical reading flash red
    /// and report failure.
    fn battery_check(&mut self) -> bool {
        let mut samples = [0u16; BATTERY_CHECK_SAMPLES];
        for s in samples.iter_mut() {
            *s = supply_millivolts(self.board.sample_supply());
        }
        let mv = safety::average_millivolts(&samples);
        self.state.info.supply_mv = mv;
        if !self.update_battery(mv) {
            return true;
        }
        for _ in 0..CRITICAL_FLASH_COUNT {
            self.board.set_rgb(Some(Color::RED));
            self.board.delay_ms(CRITICAL_FLASH_MS);
            self.board.set_rgb(None);
            self.board.delay_ms(CRITICAL_FLASH_MS);
        }
        false
    }

    // Modes

    fn apply(&mut self, t: Transition) {
        let from = self.mode();
        if !from.can_transition_to(t.to) {
            warn!("Mode: refusing {:?} -> {:?}", from, t.to);
            return;
        }
        if let Some(code) = t.error {
            warn!("Mode: {:?} failed with {:?}", from, code);
            self.state.info.error = code;
        }
        self.enter(t.to);
    }

    /// Switch modes and drive the peripherals the new mode owns.
    fn enter(&mut self, mode: Mode) {
        info!("Mode: {:?} -> {:?}", self.mode(), mode);
        self.power.enter(mode);
        self.state.status.mode = mode;
        match mode {
            Mode::Sleep => {
                self.stop_recording();
                let duty = self.rumbler.stop();
                self.board.set_rumbler(duty);
                self.board.set_backlight(0);
                self.board.set_host_power(false);
                self.board.set_irq(false);
                self.rgb = None;
                self.board.set_rgb(None);
            }
            Mode::PowerUp => self.board.set_host_power(true),
            Mode::On => {
                self.board.set_backlight(self.state.info.brightness);
                let duty = self.rumbler.ok();
                self.board.set_rumbler(duty);
            }
            Mode::PowerDown => {
                self.stop_recording();
                self.board.set_backlight(0);
            }
            Mode::WakeUp | Mode::Bootloader => {}
        }
        if let Some(color) = Color::for_error(self.state.info.error) {
            self.board.set_rgb(Some(color));
        }
        self.notify_host();
    }

    // Host notification

    /// State changed. Raised by [`poll`](Self::poll), or handed to it through
    /// `IRQ_PENDING` when requested from the sampler.
    fn notify_host(&mut self) {
        self.notify = true;
    }

    /// Drive the IRQ line for a pending state notification (only while the
    /// host is up and audio does not own the line) or a completed batch.
    fn raise_notification(&mut self, batch: bool) {
        let state = core::mem::take(&mut self.notify) | self.flags.take(Flags::IRQ_PENDING);
        let recording = self.audio.is_recording();
        let wanted = if recording {
            batch
        } else {
            state && self.mode().host_powered()
        };
        if wanted {
            self.board.set_irq(true);
        }
    }
}

impl<B: Board> SlaveEvents for Controller<'_, B> {
    fn start_receive(&mut self) -> Ack {
        self.bus.start_receive(self.flags)
    }

    fn receive(&mut self, byte: u8) -> Ack {
        self.bus.receive(byte)
    }

    fn stop_receive(&mut self) {
        self.bus.stop_receive(self.flags);
    }

    fn start_transmit(&mut self) {
        self.board.set_irq(false);
        if self.audio.is_recording() {
            let ring = &self.audio.ring;
            self.state.status.batch_index = ring.batch_index();
            self.state.status.batch_incomplete = !ring.batch_ready();
        }
        let bytes = self.state.to_bytes();
        self.bus.start_transmit(&bytes, &self.audio.ring);
    }

    fn transmit(&mut self) -> u8 {
        self.bus.transmit()
    }

    fn stop_transmit(&mut self) {
        let recording = self.audio.is_recording();
        if !self.bus.stop_transmit(&mut self.audio.ring, recording) {
            return;
        }
        let ring = &self.audio.ring;
        self.state.status.batch_index = ring.batch_index();
        if ring.batch_ready() {
            // next batch already complete, call the host straight back
            self.board.set_irq(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::opcode;
    use crate::hal::Supervisor;
    use crate::config::{BTN_HOME_POWERON_PRESS, RPI_POWERDOWN_TIMEOUT, RPI_POWERUP_TIMEOUT};
    use crate::sim::{self, SimBoard, SimInputs};
    use crate::state::STATE_SIZE;

    fn booted(flags: &Flags) -> Controller<'_, SimBoard> {
        let mut ctl = Controller::new(SimBoard::new(), flags);
        ctl.boot();
        ctl
    }

    fn powered_on(flags: &Flags) -> Controller<'_, SimBoard> {
        let mut ctl = booted(flags);
        sim::host_command(&mut ctl, Command::PowerOn);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::On);
        ctl
    }

    #[test]
    fn boot_with_good_battery_powers_the_host() {
        let flags = Flags::new();
        let ctl = booted(&flags);
        assert_eq!(ctl.mode(), Mode::PowerUp);
        assert!(ctl.board().host_power);
        assert_eq!(ctl.state().info.error, ErrorCode::NoError);
    }

    #[test]
    fn watchdog_reset_is_reported() {
        let flags = Flags::new();
        let mut board = SimBoard::new();
        board.reset_reason = ResetReason::Watchdog;
        let mut ctl = Controller::new(board, &flags);
        ctl.boot();
        assert_eq!(ctl.state().info.error, ErrorCode::WatchdogTimeout);
        assert_eq!(ctl.board().rgb, Some(Color::MAGENTA));
    }

    #[test]
    fn power_on_enters_on() {
        let flags = Flags::new();
        let ctl = powered_on(&flags);
        assert_eq!(ctl.board().backlight, DEFAULT_BRIGHTNESS);
        assert!(ctl.board().rumbler > 0);
        assert!(ctl.board().irq);
    }

    #[test]
    fn info_reply_follows_status() {
        let flags = Flags::new();
        let mut ctl = booted(&flags);
        sim::host_write(&mut ctl, &[opcode::INFO]);
        ctl.poll();
        let read: [u8; 1 + INFO_SIZE] = sim::host_read(&mut ctl);
        let chip = ctl.board().chip_info();
        assert_eq!(read[0], ctl.state().status.to_byte());
        assert_eq!(&read[1..4], &chip.signature);
        assert_eq!(read[4], 1);
        assert_eq!(&read[20..22], &chip.page_size.to_be_bytes());

        // one-shot: the next read is the device state again
        let again: [u8; STATE_SIZE] = sim::host_read(&mut ctl);
        assert_eq!(again, ctl.state().to_bytes());
    }

    #[test]
    fn commands_outside_on_are_rejected() {
        let flags = Flags::new();
        let mut ctl = booted(&flags);
        sim::host_command(&mut ctl, Command::StartAudioRecording);
        ctl.poll();
        assert!(!ctl.is_recording());
        sim::host_command(&mut ctl, Command::PowerDown);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::PowerUp);
        // the rejected command still frees the buffer
        assert!(!flags.any(Flags::COMMAND_READY));
    }

    #[test]
    fn power_down_waits_for_host_halt() {
        let flags = Flags::new();
        let mut ctl = powered_on(&flags);
        let inputs = SimInputs::default();
        sim::host_command(&mut ctl, Command::PowerDown);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::PowerDown);
        assert!(ctl.board().host_power);
        assert_eq!(ctl.board().backlight, 0);

        sim::run_ticks(&mut ctl, &inputs, 50);
        assert_eq!(ctl.mode(), Mode::PowerDown);
        ctl.board_mut().shutdown_level = 255;
        sim::run_ticks(&mut ctl, &inputs, 1);
        assert_eq!(ctl.mode(), Mode::Sleep);
        assert!(!ctl.board().host_power);
        assert_eq!(ctl.state().info.error, ErrorCode::NoError);
    }

    #[test]
    fn critical_battery_while_on_forces_power_down() {
        let flags = Flags::new();
        let mut ctl = powered_on(&flags);
        let inputs = SimInputs {
            supply_mv: 3200,
            ..SimInputs::default()
        };
        sim::run_ticks(&mut ctl, &inputs, 1);
        assert!(flags.any(Flags::BATTERY_CRITICAL));
        assert_eq!(ctl.mode(), Mode::On);

        ctl.poll();
        assert_eq!(ctl.mode(), Mode::PowerDown);
        assert!(!flags.any(Flags::BATTERY_CRITICAL));
    }

    #[test]
    fn critical_battery_before_on_waits_for_on() {
        let flags = Flags::new();
        let mut ctl = booted(&flags);
        let low = SimInputs {
            supply_mv: 3200,
            ..SimInputs::default()
        };
        sim::run_ticks(&mut ctl, &low, 1);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::PowerUp);

        sim::host_command(&mut ctl, Command::PowerOn);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::On);
        sim::run_ticks(&mut ctl, &low, 1);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::PowerDown);
    }

    #[test]
    fn unresponsive_power_down_times_out() {
        let flags = Flags::new();
        let mut ctl = powered_on(&flags);
        sim::host_command(&mut ctl, Command::PowerDown);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::PowerDown);

        sim::run_ticks(&mut ctl, &SimInputs::default(), RPI_POWERDOWN_TIMEOUT as u32);
        assert_eq!(ctl.mode(), Mode::Sleep);
        assert!(!ctl.board().host_power);
        assert_eq!(ctl.state().info.error, ErrorCode::RPiPowerDownTimeout);
        assert_eq!(ctl.board().rgb, Some(Color::YELLOW));
    }

    #[test]
    fn home_press_in_sleep_wakes_after_long_press() {
        let flags = Flags::new();
        let mut ctl = booted(&flags);
        let inputs = SimInputs::default();
        sim::run_ticks(&mut ctl, &inputs, RPI_POWERUP_TIMEOUT as u32);
        assert_eq!(ctl.mode(), Mode::Sleep);

        ctl.home_edge(true);
        ctl.poll();
        assert_eq!(ctl.mode(), Mode::WakeUp);
        sim::run_ticks(&mut ctl, &inputs, BTN_HOME_POWERON_PRESS as u32);
        assert_eq!(ctl.mode(), Mode::PowerUp);
        assert!(ctl.board().host_power);
    }

    #[test]
    fn short_home_press_goes_back_to_sleep() {
        let flags = Flags::new();
        let mut ctl = booted(&flags);
        let inputs = SimInputs::default();
        sim::run_ticks(&mut ctl, &inputs, RPI_POWERUP_TIMEOUT as u32);

        ctl.home_edge(true);
        ctl.poll();
        sim::run_ticks(&mut ctl, &inputs, 20);
        ctl.home_edge(false);
        ctl.poll();
        sim::run_ticks(&mut ctl, &inputs, 1);
        assert_eq!(ctl.mode(), Mode::Sleep);
        assert!(!ctl.board().host_power);
    }

    #[test]
    fn button_change_notifies_host() {
        let flags = Flags::new();
        let mut ctl = powered_on(&flags);
        let mut inputs = SimInputs::default();
        sim::run_ticks(&mut ctl, &inputs, 2);
        ctl.poll();
        let _: [u8; 1] = sim::host_read(&mut ctl);
        assert!(!ctl.board().irq);

        inputs.ladders[0] = 0;
        sim::run_ticks(&mut ctl, &inputs, 2);
        assert_eq!(ctl.state().controls.buttons & 0b111, 0b111);
        // the sampler only requests it; the main loop drives the line
        assert!(flags.any(Flags::IRQ_PENDING));
        assert!(!ctl.board().irq);
        ctl.poll();
        assert!(ctl.board().irq);
        assert!(!flags.any(Flags::IRQ_PENDING));
    }

    #[test]
    fn telemetry_alone_does_not_notify() {
        let flags = Flags::new();
        let mut ctl = powered_on(&flags);
        let mut inputs = SimInputs::default();
        sim::run_ticks(&mut ctl, &inputs, 2);
        ctl.poll();
        let _: [u8; 1] = sim::host_read(&mut ctl);

        inputs.temperature_raw += 10;
        inputs.battery_mv -= 100;
        sim::run_ticks(&mut ctl, &inputs, 2);
        ctl.poll();
        assert!(!ctl.board().irq);
    }

    #[test]
    fn second_tick_pets_watchdog_and_counts_uptime() {
        let flags = Flags::new();
        let mut ctl = booted(&flags);
        for _ in 0..3 {
            ctl.second_tick();
            ctl.poll();
        }
        assert_eq!(ctl.board().watchdog_pets, 3);
        assert_eq!(ctl.state().info.uptime, 3);
    }

    #[test]
    fn persistent_state_round_trip() {
        let flags = Flags::new();
        let mut ctl = powered_on(&flags);
        let p = PersistentState {
            brightness: 42,
            volume: 5,
            ..PersistentState::default()
        };
        sim::host_command(&mut ctl, Command::SetPersistentState(p));
        ctl.poll();
        assert!(flags.take(Flags::PERSIST_DIRTY));
        assert_eq!(ctl.board().backlight, 42);

        sim::host_command(&mut ctl, Command::GetPersistentState);
        ctl.poll();
        let read: [u8; 1 + PersistentState::SIZE] = sim::host_read(&mut ctl);
        assert_eq!(PersistentState::from_bytes(&read[1..]), Ok(p));
    }

    #[test]
    fn clear_error_turns_indicator_off() {
        let flags = Flags::new();
        let mut board = SimBoard::new();
        board.reset_reason = ResetReason::PowerOn;
        let mut ctl = Controller::new(board, &flags);
        ctl.boot();
        assert_eq!(ctl.board().rgb, Some(Color::WHITE));
        sim::host_command(&mut ctl, Command::ClearError);
        ctl.poll();
        assert_eq!(ctl.state().info.error, ErrorCode::NoError);
        assert_eq!(ctl.board().rgb, None);
    }
}
