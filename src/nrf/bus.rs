//! TWIS task: the I2C slave.
//!
//! The peripheral acknowledges its address in hardware, so a write that
//! arrives while a command is still pending is received and dropped rather
//! than NACKed on the wire.

use defmt::{debug, warn};
use embassy_nrf::peripherals::TWISPI0;
use embassy_nrf::twis::{self, Twis};
use rckid_ctl::bus::TX_WINDOW_SIZE;
use rckid_ctl::config::I2C_BUFFER_SIZE;
use rckid_ctl::hal::{Ack, SlaveEvents};

use super::{with_controller, POLL};

/// Bytes offered per read. The controller repeats its window past the end,
/// so longer reads simply see it again.
const TX_BUFFER_SIZE: usize = TX_WINDOW_SIZE * 2;

#[embassy_executor::task]
pub async fn bus_task(mut twis: Twis<'static, TWISPI0>) {
    let mut rx = [0u8; I2C_BUFFER_SIZE];
    let mut tx = [0u8; TX_BUFFER_SIZE];
    loop {
        match twis.listen(&mut rx).await {
            Ok(twis::Command::Write(n)) => host_write(&rx[..n]),
            Ok(twis::Command::WriteRead(n)) => {
                host_write(&rx[..n]);
                host_read(&mut twis, &mut tx).await;
            }
            Ok(twis::Command::Read) => host_read(&mut twis, &mut tx).await,
            Err(e) => warn!("I2C listen error: {:?}", e),
        }
    }
}

fn host_write(bytes: &[u8]) {
    let accepted = with_controller(|ctl| {
        if ctl.start_receive() == Ack::Nack {
            ctl.stop_receive();
            return false;
        }
        for &b in bytes {
            if ctl.receive(b) == Ack::Nack {
                break;
            }
        }
        ctl.stop_receive();
        true
    });
    match accepted {
        Some(true) => POLL.signal(()),
        Some(false) => debug!("I2C: command pending, dropped {} byte write", bytes.len()),
        None => {}
    }
}

async fn host_read(twis: &mut Twis<'static, TWISPI0>, tx: &mut [u8; TX_BUFFER_SIZE]) {
    with_controller(|ctl| ctl.bus_read(tx));
    let sent = match twis.respond_to_read(tx).await {
        Ok(n) => n,
        Err(e) => {
            warn!("I2C read error: {:?}", e);
            0
        }
    };
    with_controller(|ctl| ctl.bus_read_done(sent));
}
