pub mod config;
pub mod serial;

use {
    config::Config,
    embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex,
    serial::Serial,
    sts_driver::Bus,
};

pub type Mutex<Item> = embassy_sync::mutex::Mutex<CriticalSectionRawMutex, Item>;

/// A servo bus on a real serial port, shareable across threads.
pub type Link = sts_driver::Link<Mutex<Bus<Serial>>>;

#[inline]
pub fn open(config: &Config) -> Result<Link, serial::Error> {
    let serial = Serial::open(config)?;
    Ok(Link::new(Bus::new(serial, config.timeout())))
}
