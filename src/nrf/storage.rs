//! Persistent state in the nRF52840's internal flash.
//!
//! A single `sequential-storage` map record holds the [`PersistentState`]
//! image. The crate handles wear levelling and garbage collection across the
//! reserved pages.

use defmt::{debug, error, info, warn};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_nrf::nvmc::Nvmc;
use embassy_time::Timer;
use embedded_storage_async::nor_flash::NorFlash;
use rckid_ctl::config::{PERSIST_DELAY_MS, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use rckid_ctl::persist::PersistentState;
use rckid_ctl::Flags;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

use super::{with_controller, FLAGS, PERSIST};

pub type Flash = BlockingAsync<Nvmc<'static>>;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

const KEY_PERSISTENT_STATE: u8 = 0x01;

/// Scratch buffer for map operations; the record itself is a few bytes.
const MAX_RECORD_SIZE: usize = 64;

pub async fn load(flash: &mut impl NorFlash) -> Option<PersistentState> {
    let mut buf = [0u8; MAX_RECORD_SIZE];
    match fetch_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_PERSISTENT_STATE,
    )
    .await
    {
        Ok(Some(data)) => match PersistentState::from_bytes(data) {
            Ok(state) => {
                info!("Loaded persistent state from flash");
                Some(state)
            }
            Err(e) => {
                warn!("Ignoring stored state: {:?}", e);
                None
            }
        },
        Ok(None) => {
            info!("No persistent state in flash");
            None
        }
        Err(e) => {
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
            None
        }
    }
}

pub async fn save(flash: &mut impl NorFlash, state: &PersistentState) {
    let mut buf = [0u8; MAX_RECORD_SIZE];
    let image = state.to_bytes();
    match store_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_PERSISTENT_STATE,
        &&image[..],
    )
    .await
    {
        Ok(()) => info!("Saved persistent state to flash"),
        Err(e) => error!("Flash write error: {:?}", defmt::Debug2Format(&e)),
    }
}

/// Writes the persistent state once changes have settled.
#[embassy_executor::task]
pub async fn storage_task(mut flash: Flash) {
    loop {
        PERSIST.wait().await;
        Timer::after_millis(PERSIST_DELAY_MS).await;
        if !FLAGS.take(Flags::PERSIST_DIRTY) {
            debug!("Storage: nothing to save");
            continue;
        }
        if let Some(state) = with_controller(|ctl| ctl.persistent_state()) {
            save(&mut flash, &state).await;
        }
    }
}
