//! `NrfBoard`: the controller's hardware traits on nRF52840 peripherals.

use embassy_futures::block_on;
use embassy_nrf::gpio::{Input, Output};
use embassy_nrf::pac;
use embassy_nrf::peripherals::{PWM0, PWM1};
use embassy_nrf::pwm::SimplePwm;
use embassy_nrf::wdt::WatchdogHandle;
use embedded_hal::delay::DelayNs;
use rckid_ctl::analog::TempCalibration;
use rckid_ctl::hal::{
    AudioFrontEnd, Backlight, ChipInfo, Haptics, HostLink, Indicator, PowerRails, ResetReason,
    Supervisor,
};
use rckid_ctl::indicator::Color;

use super::analog::{self, SharedSaadc};

/// CPU clock, for busy-wait delays.
const CPU_HZ: u32 = 64_000_000;

// Channels of the backlight / rumbler PWM.
const PWM_BACKLIGHT: usize = 0;
const PWM_RUMBLER: usize = 1;

pub struct NrfBoard {
    host_power: Output<'static>,
    /// Open-drain "read me" line to the host.
    irq: Output<'static>,
    /// Host's "safe to cut power" output.
    shutdown: Input<'static>,
    pwm: SimplePwm<'static, PWM0>,
    rgb: SimplePwm<'static, PWM1>,
    watchdog: WatchdogHandle,
    saadc: &'static SharedSaadc,
    reset_reason: ResetReason,
}

impl NrfBoard {
    pub fn new(
        host_power: Output<'static>,
        irq: Output<'static>,
        shutdown: Input<'static>,
        mut pwm: SimplePwm<'static, PWM0>,
        mut rgb: SimplePwm<'static, PWM1>,
        watchdog: WatchdogHandle,
        saadc: &'static SharedSaadc,
    ) -> Self {
        pwm.set_max_duty(u8::MAX as u16);
        rgb.set_max_duty(u8::MAX as u16);
        Self {
            host_power,
            irq,
            shutdown,
            pwm,
            rgb,
            watchdog,
            saadc,
            reset_reason: take_reset_reason(),
        }
    }
}

/// Read and clear the sticky reset-reason register.
fn take_reset_reason() -> ResetReason {
    let r = pac::POWER.resetreas().read();
    let reason = if r.dog() {
        ResetReason::Watchdog
    } else if r.sreq() {
        ResetReason::Software
    } else if r.resetpin() || r.lockup() || r.off() {
        ResetReason::Other
    } else {
        // nothing flagged: power-on or brown-out
        ResetReason::PowerOn
    };
    pac::POWER.resetreas().write_value(r);
    reason
}

impl PowerRails for NrfBoard {
    fn set_host_power(&mut self, on: bool) {
        if on {
            self.host_power.set_high();
        } else {
            self.host_power.set_low();
        }
    }
}

impl Backlight for NrfBoard {
    fn set_backlight(&mut self, duty: u8) {
        self.pwm.set_duty(PWM_BACKLIGHT, duty as u16);
    }
}

impl Haptics for NrfBoard {
    fn set_rumbler(&mut self, duty: u8) {
        self.pwm.set_duty(PWM_RUMBLER, duty as u16);
    }
}

impl Indicator for NrfBoard {
    fn set_rgb(&mut self, color: Option<Color>) {
        let c = color.unwrap_or_default();
        self.rgb.set_duty(0, c.r as u16);
        self.rgb.set_duty(1, c.g as u16);
        self.rgb.set_duty(2, c.b as u16);
    }
}

impl HostLink for NrfBoard {
    fn set_irq(&mut self, asserted: bool) {
        if asserted {
            self.irq.set_low();
        } else {
            self.irq.set_high();
        }
    }

    fn shutdown_level(&mut self) -> u8 {
        if self.shutdown.is_high() {
            u8::MAX
        } else {
            0
        }
    }
}

impl AudioFrontEnd for NrfBoard {
    // The microphone shares the scan with the other channels; the analog
    // task feeds it only while the controller is recording.
    fn start_audio(&mut self) {}

    fn stop_audio(&mut self) {}
}

impl DelayNs for NrfBoard {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = ns as u64 * (CPU_HZ / 1_000_000) as u64 / 1000;
        cortex_m::asm::delay(cycles.max(1) as u32);
    }
}

impl Supervisor for NrfBoard {
    fn pet_watchdog(&mut self) {
        self.watchdog.pet();
    }

    fn reset_reason(&mut self) -> ResetReason {
        self.reset_reason
    }

    fn reset(&mut self) {
        cortex_m::peripheral::SCB::sys_reset();
    }

    /// Fresh VDD conversion when the ADC is free, otherwise the last scan.
    fn sample_supply(&mut self) -> u16 {
        if let Ok(mut adc) = self.saadc.try_lock() {
            let mut scan = [0i16; analog::CHANNELS];
            block_on(adc.sample(&mut scan));
            analog::store_supply(scan[analog::VDD]);
        }
        analog::last_supply_raw()
    }

    fn chip_info(&self) -> ChipInfo {
        let id = pac::FICR.deviceid(0).read().to_le_bytes();
        let part = pac::FICR.info().part().read().0.to_le_bytes();
        let mut fuses = [0u8; 11];
        fuses[..4].copy_from_slice(&part);
        ChipInfo {
            signature: [id[0], id[1], id[2]],
            fuses,
            clock: CPU_HZ.to_le_bytes(),
            page_size: 4096,
        }
    }

    fn temp_calibration(&self) -> TempCalibration {
        TempCalibration::default()
    }
}
