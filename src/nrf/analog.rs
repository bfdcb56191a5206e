//! Analog task: one SAADC scan per audio period.
//!
//! Every scan feeds the microphone to the audio pipeline while recording.
//! Every fifth scan (one 625 µs slot) also hands the sampler the channel it
//! is waiting for, so a full pass over the eight channels takes 5 ms.

use core::sync::atomic::{AtomicU16, Ordering};

use defmt::{debug, info};
use embassy_futures::select::{select, Either};
use embassy_nrf::saadc::{self, ChannelConfig, Gain, Reference, Saadc};
use embassy_nrf::temp::Temp;
use embassy_nrf::Peripheral;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Ticker, Timer};
use rckid_ctl::analog::Channel;
use rckid_ctl::config::{ADC_SLOT_PERIOD_US, AUDIO_SAMPLE_RATE_HZ, BANDGAP_MV_X1024};
use rckid_ctl::{Flags, Mode};

use super::{with_controller, FLAGS, POLL, WAKE};

pub const CHANNELS: usize = 8;

// Scan order of the SAADC channels.
pub const VDD: usize = 0;
pub const BATTERY: usize = 1;
pub const CHARGE: usize = 2;
pub const LADDER2: usize = 3;
pub const LADDER1: usize = 4;
pub const JOY_H: usize = 5;
pub const JOY_V: usize = 6;
pub const MIC: usize = 7;

pub type SharedSaadc = Mutex<CriticalSectionRawMutex, Saadc<'static, CHANNELS>>;

/// Full-scale input of the VDD channel (internal 0.6 V reference, gain 1/6).
const VDD_FULL_SCALE_MV: u32 = 3600;

/// Scans per sampler slot.
const SCANS_PER_SLOT: u32 = (ADC_SLOT_PERIOD_US * AUDIO_SAMPLE_RATE_HZ as u64 / 1_000_000) as u32;

/// Supply refresh period while asleep.
const SLEEP_REFRESH: Duration = Duration::from_secs(1);

/// Last supply reading in bandgap-equivalent form. Starts at full scale,
/// which decodes as a flat battery until the first real conversion.
static LAST_SUPPLY_RAW: AtomicU16 = AtomicU16::new(1023);

/// Channel referenced against VDD/4 with gain 1/4: full scale is VDD, so
/// the reading is ratiometric like the resistor ladders and joystick.
pub fn ratiometric<'d>(pin: impl Peripheral<P = impl saadc::Input> + 'd) -> ChannelConfig<'d> {
    let mut config = ChannelConfig::single_ended(pin);
    config.reference = Reference::VDD1_4;
    config.gain = Gain::GAIN1_4;
    config
}

/// Convert a VDD sample to the reading a bandgap-vs-VCC converter gives,
/// store it and return it.
pub fn store_supply(sample: i16) -> u16 {
    let mv = sample.max(0) as u32 * VDD_FULL_SCALE_MV / 1024;
    let raw = (BANDGAP_MV_X1024 / mv.max(1)).clamp(1, 1023) as u16;
    LAST_SUPPLY_RAW.store(raw, Ordering::Relaxed);
    raw
}

pub fn last_supply_raw() -> u16 {
    LAST_SUPPLY_RAW.load(Ordering::Relaxed)
}

/// Die temperature in quarter degrees Celsius to half kelvin.
fn half_kelvin(quarter_celsius: i32) -> u16 {
    (quarter_celsius / 2 + 546).clamp(0, 1023) as u16
}

fn unsigned(sample: i16) -> u16 {
    sample.clamp(0, 1023) as u16
}

/// Raw 10-bit value the sampler expects for `channel`.
fn raw_for(channel: Channel, scan: &[i16; CHANNELS], temperature: u16) -> u16 {
    match channel {
        Channel::Supply => store_supply(scan[VDD]),
        Channel::Temperature => temperature,
        Channel::Battery => unsigned(scan[BATTERY]),
        Channel::Charger => unsigned(scan[CHARGE]),
        Channel::Ladder2 => unsigned(scan[LADDER2]),
        Channel::Ladder1 => unsigned(scan[LADDER1]),
        Channel::JoystickH => unsigned(scan[JOY_H]),
        Channel::JoystickV => unsigned(scan[JOY_V]),
    }
}

#[embassy_executor::task]
pub async fn analog_task(saadc: &'static SharedSaadc, mut temp: Temp<'static>) {
    info!("Analog task started: {} scans per slot", SCANS_PER_SLOT);
    let mut ticker = Ticker::every(Duration::from_hz(AUDIO_SAMPLE_RATE_HZ as u64));
    let mut scans: u32 = 0;
    let mut temperature = half_kelvin(25 * 4);

    loop {
        if with_controller(|ctl| ctl.mode()).unwrap_or(Mode::Sleep) == Mode::Sleep {
            debug!("Analog: sleeping");
            loop {
                let mut scan = [0i16; CHANNELS];
                saadc.lock().await.sample(&mut scan).await;
                store_supply(scan[VDD]);
                if let Either::First(()) = select(WAKE.wait(), Timer::after(SLEEP_REFRESH)).await {
                    break;
                }
            }
            debug!("Analog: awake");
            ticker.reset();
        }

        let mut scan = [0i16; CHANNELS];
        saadc.lock().await.sample(&mut scan).await;
        let slot = scans % SCANS_PER_SLOT == 0;
        scans = scans.wrapping_add(1);

        if slot && with_controller(|ctl| ctl.sampler_channel()) == Some(Channel::Temperature) {
            temperature = half_kelvin(temp.read().await.to_bits());
        }

        with_controller(|ctl| {
            if ctl.is_recording() {
                ctl.audio_sample((unsigned(scan[MIC]) >> 2) as u8);
                ctl.audio_tick();
            }
            if slot {
                let raw = raw_for(ctl.sampler_channel(), &scan, temperature);
                ctl.adc_result(raw);
            }
        });
        if FLAGS.any(Flags::AUDIO_BATCH_VALID | Flags::IRQ_PENDING | Flags::BATTERY_CRITICAL) {
            POLL.signal(());
        }

        ticker.next().await;
    }
}
