//! Integration tests for rckid-ctl host-testable logic, driven end to end
//! through the simulated board and bus helpers.

use rckid_ctl::analog::decode_ladder;
use rckid_ctl::command::opcode;
use rckid_ctl::config::{AUDIO_BATCHES, AUDIO_BATCH_SIZE, LADDER_BREAKPOINTS, RPI_POWERUP_TIMEOUT};
use rckid_ctl::controller::INFO_SIZE;
use rckid_ctl::hal::Ack;
use rckid_ctl::indicator::Color;
use rckid_ctl::sim::{self, SimBoard, SimInputs};
use rckid_ctl::state::{Status, STATE_SIZE};
use rckid_ctl::{Command, Controller, DeviceState, ErrorCode, Flags, Mode};

fn booted(flags: &Flags) -> Controller<'_, SimBoard> {
    let mut ctl = Controller::new(SimBoard::new(), flags);
    ctl.boot();
    ctl
}

fn powered_on(flags: &Flags) -> Controller<'_, SimBoard> {
    let mut ctl = booted(flags);
    assert_eq!(sim::host_command(&mut ctl, Command::PowerOn), Ack::Ack);
    ctl.poll();
    assert_eq!(ctl.mode(), Mode::On);
    ctl
}

#[test]
fn flat_battery_at_boot_flashes_red_and_stays_asleep() {
    let flags = Flags::new();
    let mut board = SimBoard::new();
    board.set_supply_millivolts(2000);
    let mut ctl = Controller::new(board, &flags);
    ctl.boot();

    assert_eq!(ctl.mode(), Mode::Sleep);
    assert_eq!(ctl.board().flashes(Color::RED), 5);
    assert!(!ctl.board().host_power);
    assert!(ctl.battery_critical());

    // nothing the sampler sees at this voltage gets the host powered
    let inputs = SimInputs {
        supply_mv: 2000,
        ..SimInputs::default()
    };
    sim::run_ticks(&mut ctl, &inputs, 50);
    ctl.poll();
    assert_eq!(ctl.mode(), Mode::Sleep);
    assert!(!ctl.board().host_power);
}

#[test]
fn flat_battery_refuses_to_wake() {
    let flags = Flags::new();
    let mut ctl = booted(&flags);
    sim::run_ticks(&mut ctl, &SimInputs::default(), RPI_POWERUP_TIMEOUT as u32 + 1);
    assert_eq!(ctl.mode(), Mode::Sleep);
    assert_eq!(ctl.board().flashes(Color::RED), 0);

    ctl.board_mut().set_supply_millivolts(3200);
    ctl.home_edge(true);
    ctl.poll();

    assert_eq!(ctl.mode(), Mode::Sleep);
    assert_eq!(ctl.board().flashes(Color::RED), 5);
    assert!(!ctl.board().host_power);

    // held on a flat battery, home never powers the host
    let low = SimInputs {
        supply_mv: 3200,
        ..SimInputs::default()
    };
    sim::run_ticks(&mut ctl, &low, 300);
    ctl.poll();
    assert_eq!(ctl.mode(), Mode::Sleep);
}

#[test]
fn host_that_never_boots_is_cut_off() {
    let flags = Flags::new();
    let mut ctl = booted(&flags);
    assert_eq!(ctl.mode(), Mode::PowerUp);
    assert!(ctl.board().host_power);

    sim::run_ticks(&mut ctl, &SimInputs::default(), RPI_POWERUP_TIMEOUT as u32 + 1);

    assert_eq!(ctl.mode(), Mode::Sleep);
    assert!(!ctl.board().host_power);
    assert_eq!(ctl.state().info.error, ErrorCode::RPiBootTimeout);
    assert_eq!(ctl.board().rgb, Some(Color::BLUE));
}

#[test]
fn recorded_batches_are_read_in_order() {
    let flags = Flags::new();
    let mut ctl = powered_on(&flags);
    // drain the power-on notification
    let _: [u8; STATE_SIZE] = sim::host_read(&mut ctl);
    assert!(!ctl.board().irq);

    sim::host_command(&mut ctl, Command::StartAudioRecording);
    ctl.poll();
    assert!(ctl.is_recording());

    let mut indices = [0u8; AUDIO_BATCHES];
    let mut reads = 0;
    for i in 0..AUDIO_BATCH_SIZE * AUDIO_BATCHES {
        ctl.audio_sample(0x80);
        ctl.audio_tick();
        if (i + 1) % AUDIO_BATCH_SIZE != 0 {
            continue;
        }
        ctl.poll();
        assert!(ctl.board().irq, "no interrupt after batch {}", reads);
        let window: [u8; 1 + AUDIO_BATCH_SIZE] = sim::host_read(&mut ctl);
        assert_ne!(window[0] & Status::RECORDING, 0);
        assert_eq!(window[0] & Status::BATCH_INCOMPLETE, 0);
        assert!(window[1..].iter().all(|&b| b == 0x80));
        indices[reads] = window[0] & 0x07;
        reads += 1;
    }

    assert_eq!(reads, AUDIO_BATCHES);
    assert_eq!(indices, [0, 1, 2, 3, 4, 5, 6, 7]);
    assert!(ctl.audio_ring().data().iter().all(|&b| b == 0x80));
    assert_eq!(ctl.audio_ring().pending(), 0);
    assert!(!flags.any(Flags::AUDIO_BATCH_VALID));
}

#[test]
fn info_during_recording_goes_back_to_audio() {
    let flags = Flags::new();
    let mut ctl = powered_on(&flags);
    sim::host_command(&mut ctl, Command::StartAudioRecording);
    ctl.poll();

    sim::host_command(&mut ctl, Command::Info);
    ctl.poll();
    let reply: [u8; 1 + INFO_SIZE] = sim::host_read(&mut ctl);
    assert_eq!(reply[4], 1);

    for _ in 0..AUDIO_BATCH_SIZE {
        ctl.audio_sample(0x80);
        ctl.audio_tick();
    }
    let window: [u8; 1 + AUDIO_BATCH_SIZE] = sim::host_read(&mut ctl);
    assert_ne!(window[0] & Status::RECORDING, 0);
    assert!(window[1..].iter().all(|&b| b == 0x80));
    assert_eq!(ctl.audio_ring().pending(), 0);
}

#[test]
fn brightness_round_trips_through_state_read() {
    let flags = Flags::new();
    let mut ctl = powered_on(&flags);

    assert_eq!(sim::host_command(&mut ctl, Command::SetBrightness(170)), Ack::Ack);
    ctl.poll();
    assert_eq!(ctl.board().backlight, 170);
    assert!(flags.any(Flags::PERSIST_DIRTY));

    let bytes: [u8; STATE_SIZE] = sim::host_read(&mut ctl);
    let state = DeviceState::from_bytes(&bytes).expect("state decodes");
    assert_eq!(state.info.brightness, 170);
    assert_eq!(state.status.mode, Mode::On);
}

#[test]
fn one_command_per_write_and_nack_while_pending() {
    let flags = Flags::new();
    let mut ctl = powered_on(&flags);

    assert_eq!(sim::host_write(&mut ctl, &[opcode::SET_BRIGHTNESS, 10]), Ack::Ack);
    assert!(flags.any(Flags::COMMAND_READY));
    assert_eq!(sim::host_write(&mut ctl, &[opcode::SET_BRIGHTNESS, 20]), Ack::Nack);

    ctl.poll();
    assert!(!flags.any(Flags::COMMAND_READY));
    assert_eq!(ctl.state().info.brightness, 10);

    // trailing bytes belong to the same command and are ignored
    assert_eq!(
        sim::host_write(&mut ctl, &[opcode::SET_BRIGHTNESS, 30, opcode::POWER_DOWN]),
        Ack::Ack
    );
    ctl.poll();
    assert_eq!(ctl.state().info.brightness, 30);
    assert_eq!(ctl.mode(), Mode::On);
}

#[test]
fn info_reply_is_served_once() {
    let flags = Flags::new();
    let mut ctl = powered_on(&flags);
    sim::host_command(&mut ctl, Command::Info);
    ctl.poll();

    let reply: [u8; 1 + INFO_SIZE] = sim::host_read(&mut ctl);
    assert_eq!(&reply[1..4], &ctl.board().chip.signature);
    assert_eq!(reply[4], 1);
    assert_eq!(u16::from_be_bytes([reply[20], reply[21]]), ctl.board().chip.page_size);

    let next: [u8; STATE_SIZE] = sim::host_read(&mut ctl);
    assert!(DeviceState::from_bytes(&next).is_some());
}

#[test]
fn scripted_session_only_takes_legal_transitions() {
    let flags = Flags::new();
    let inputs = SimInputs::default();
    let mut seen: heapless::Vec<Mode, 32> = heapless::Vec::new();
    let mut record = |m: Mode| {
        if seen.last() != Some(&m) {
            seen.push(m).unwrap();
        }
    };

    let mut ctl = booted(&flags);
    record(ctl.mode());

    sim::host_command(&mut ctl, Command::PowerOn);
    ctl.poll();
    record(ctl.mode());

    sim::host_command(&mut ctl, Command::PowerDown);
    ctl.poll();
    record(ctl.mode());

    ctl.board_mut().shutdown_level = 255;
    sim::run_ticks(&mut ctl, &inputs, 1);
    record(ctl.mode());
    ctl.board_mut().shutdown_level = 0;

    // short press: wakes, then gives up
    ctl.home_edge(true);
    ctl.poll();
    record(ctl.mode());
    ctl.home_edge(false);
    ctl.poll();
    sim::run_ticks(&mut ctl, &inputs, 1);
    record(ctl.mode());

    // long press: powers the host, which never answers
    ctl.home_edge(true);
    ctl.poll();
    record(ctl.mode());
    sim::run_ticks(&mut ctl, &inputs, 251);
    record(ctl.mode());
    ctl.home_edge(false);
    ctl.poll();
    sim::run_ticks(&mut ctl, &inputs, RPI_POWERUP_TIMEOUT as u32 + 1);
    record(ctl.mode());

    assert_eq!(
        seen.as_slice(),
        &[
            Mode::PowerUp,
            Mode::On,
            Mode::PowerDown,
            Mode::Sleep,
            Mode::WakeUp,
            Mode::Sleep,
            Mode::WakeUp,
            Mode::PowerUp,
            Mode::Sleep,
        ]
    );
    for pair in seen.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
    }
}

#[test]
fn ladder_decoder_matches_breakpoints_everywhere() {
    for raw in 0..=u8::MAX {
        let expected = LADDER_BREAKPOINTS
            .iter()
            .find(|(limit, _)| raw <= *limit)
            .map_or(0, |(_, combo)| *combo);
        assert_eq!(decode_ladder(raw), expected, "raw {}", raw);
    }
    assert_eq!(decode_ladder(0), 0b111);
    assert_eq!(decode_ladder(u8::MAX), 0);
}

#[test]
fn second_ticks_pet_the_watchdog_and_fire_the_alarm() {
    let flags = Flags::new();
    let mut ctl = powered_on(&flags);
    let _: [u8; STATE_SIZE] = sim::host_read(&mut ctl);

    sim::host_write(&mut ctl, &[opcode::SET_ALARM, 0, 1, 1]);
    ctl.poll();
    for _ in 0..60 {
        ctl.second_tick();
        ctl.poll();
    }

    assert_eq!(ctl.board().watchdog_pets, 60);
    assert_eq!(ctl.state().info.uptime, 60);
    assert!(ctl.state().status.alarm);
    assert!(ctl.board().irq);
}
