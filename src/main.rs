//! RCKid controller firmware for nRF52840.
//!
//! Boots the controller, restores persistent state and spawns one task per
//! hardware event source. The main loop below runs deferred work whenever a
//! task signals [`nrf::POLL`].

#![no_std]
#![no_main]

mod nrf;

use defmt::{debug, error, info};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::pwm::SimplePwm;
use embassy_nrf::saadc::{self, ChannelConfig, Saadc, VddInput};
use embassy_nrf::temp::{self, Temp};
use embassy_nrf::twis::{self, Twis};
use embassy_nrf::wdt::{self, Watchdog, WatchdogHandle};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Ticker, Timer};
use rckid_ctl::config::{HOME_DEBOUNCE_MS, I2C_ADDRESS, WATCHDOG_TIMEOUT_SECS};
use rckid_ctl::{Controller, Flags, Mode};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use nrf::analog::{ratiometric, SharedSaadc};
use nrf::board::NrfBoard;
use nrf::{with_controller, FLAGS, PERSIST, POLL, WAKE};

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twis::InterruptHandler<peripherals::TWISPI0>;
    SAADC => saadc::InterruptHandler;
    TEMP => temp::InterruptHandler;
});

/// RTC ticks per second feeding the watchdog counter.
const WDT_CLOCK_HZ: u32 = 32_768;

static SAADC: StaticCell<SharedSaadc> = StaticCell::new();

/// Raises the one-second tick for clock, alarm and watchdog.
#[embassy_executor::task]
async fn seconds_task() {
    let mut ticker = Ticker::every(Duration::from_secs(1));
    loop {
        ticker.next().await;
        with_controller(|ctl| ctl.second_tick());
        POLL.signal(());
    }
}

/// Home button, active low. The only wake source in `Sleep`.
#[embassy_executor::task]
async fn home_task(mut home: Input<'static>) {
    loop {
        home.wait_for_any_edge().await;
        Timer::after_millis(HOME_DEBOUNCE_MS).await;
        let pressed = home.is_low();
        debug!("Home {}", if pressed { "pressed" } else { "released" });
        with_controller(|ctl| ctl.home_edge(pressed));
        POLL.signal(());
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("rckid-ctl starting");

    // - Watchdog --------------------------------------------------
    let mut wdt_config = wdt::Config::default();
    wdt_config.timeout_ticks = WDT_CLOCK_HZ * WATCHDOG_TIMEOUT_SECS;
    wdt_config.run_during_debug_halt = false;
    let watchdog = match Watchdog::try_new::<1>(p.WDT, wdt_config) {
        Ok((_wdt, [handle])) => handle,
        Err(_) => {
            // a soft reset leaves the watchdog running with its old config
            info!("Watchdog already running");
            // SAFETY: only this handle is ever created for channel 0
            unsafe { WatchdogHandle::steal(0) }
        }
    };

    // - Analog ----------------------------------------------------
    let mut adc_config = saadc::Config::default();
    adc_config.resolution = saadc::Resolution::_10BIT;
    let channels = [
        ChannelConfig::single_ended(VddInput),
        ratiometric(p.P0_02), // battery
        ratiometric(p.P0_03), // charger status
        ratiometric(p.P0_04), // button ladder 2
        ratiometric(p.P0_05), // button ladder 1
        ratiometric(p.P0_28), // joystick H
        ratiometric(p.P0_29), // joystick V
        ratiometric(p.P0_30), // microphone
    ];
    let adc = Saadc::new(p.SAADC, Irqs, adc_config, channels);
    adc.calibrate().await;
    let saadc: &'static SharedSaadc = SAADC.init(Mutex::new(adc));
    let temp = Temp::new(p.TEMP, Irqs);

    // - Outputs ---------------------------------------------------
    let host_power = Output::new(p.P0_22, Level::Low, OutputDrive::Standard);
    let irq = Output::new(p.P0_20, Level::High, OutputDrive::Standard0Disconnect1);
    let shutdown = Input::new(p.P1_01, Pull::Down);
    let pwm = SimplePwm::new_2ch(p.PWM0, p.P0_13, p.P0_14); // backlight, rumbler
    let rgb = SimplePwm::new_3ch(p.PWM1, p.P0_15, p.P0_16, p.P0_17);
    let home = Input::new(p.P0_11, Pull::Up);

    // - I2C slave -------------------------------------------------
    let mut twis_config = twis::Config::default();
    twis_config.address0 = I2C_ADDRESS;
    let twis = Twis::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twis_config);

    // - Controller ------------------------------------------------
    let board = NrfBoard::new(host_power, irq, shutdown, pwm, rgb, watchdog, saadc);
    let mut ctl = Controller::new(board, &FLAGS);

    let mut flash = BlockingAsync::new(Nvmc::new(p.NVMC));
    if let Some(state) = nrf::storage::load(&mut flash).await {
        ctl.restore_persistent(state);
    }
    ctl.boot();
    info!("Booted into {:?}", ctl.mode());
    nrf::install(ctl);

    spawner.must_spawn(nrf::bus::bus_task(twis));
    spawner.must_spawn(nrf::analog::analog_task(saadc, temp));
    spawner.must_spawn(seconds_task());
    spawner.must_spawn(home_task(home));
    spawner.must_spawn(nrf::storage::storage_task(flash));

    loop {
        POLL.wait().await;
        let Some(mode) = with_controller(|ctl| {
            ctl.poll();
            ctl.mode()
        }) else {
            error!("Controller missing");
            continue;
        };
        if mode != Mode::Sleep {
            WAKE.signal(());
        }
        if FLAGS.any(Flags::PERSIST_DIRTY) {
            PERSIST.signal(());
        }
    }
}
