use {
    crate::{Error, Faulted, Servo, bus::Bus, comm::Comm, mutex::Mutex},
    sts_packet::{
        Ack, Fault, Id, Limits, Pid, Ping, ServoReading, constants::MAX_ID,
        control_table::Register,
    },
};

pub use crate::bus::{Configuration, Stage};

/// What to do when another caller is mid-exchange.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Acquire {
    /// Wait for the exchange in flight to finish.
    Blocking,
    /// Give up immediately.
    Skip,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Polled<T> {
    Done(T),
    /// The link was busy and nothing was sent.
    Skipped,
}

/// One serial bus shared by every caller, one exchange at a time.
pub struct Link<M>(M);

impl<C: Comm, M: Mutex<Item = Bus<C>>> Link<M> {
    #[inline(always)]
    pub fn new(bus: Bus<C>) -> Self {
        Self(<M as Mutex>::new(bus))
    }

    #[inline(always)]
    pub const fn servo(&self, id: Id) -> Servo<'_, M> {
        Servo::new(self, id)
    }

    #[inline]
    pub async fn ping(&self, id: Id) -> Result<Ping, Error<C::Error, Ping>> {
        self.0.lock().await.ping(id).await
    }

    #[inline]
    pub async fn read(&self, id: Id, register: Register) -> Result<u16, Error<C::Error, u16>> {
        self.0.lock().await.read(id, register).await
    }

    #[inline]
    pub async fn write(
        &self,
        id: Id,
        register: Register,
        value: u16,
    ) -> Result<Ack, Error<C::Error>> {
        self.0.lock().await.write(id, register, value).await
    }

    /// The read-back happens under the same lock as the write.
    #[inline]
    pub async fn write_verified(
        &self,
        id: Id,
        register: Register,
        value: u16,
    ) -> Result<(), Error<C::Error>> {
        self.0
            .lock()
            .await
            .write_verified(id, register, value)
            .await
    }

    #[inline]
    pub async fn read_block(
        &self,
        id: Id,
        address: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error<C::Error>> {
        self.0.lock().await.read_block(id, address, buffer).await
    }

    #[inline]
    pub async fn write_block(
        &self,
        id: Id,
        address: u8,
        bytes: &[u8],
    ) -> Result<Ack, Error<C::Error>> {
        self.0.lock().await.write_block(id, address, bytes).await
    }

    #[inline]
    pub async fn set_position(
        &self,
        id: Id,
        goal: i32,
        speed: i32,
        acceleration: u8,
    ) -> Result<Ack, Error<C::Error>> {
        self.0
            .lock()
            .await
            .set_position(id, goal, speed, acceleration)
            .await
    }

    #[inline]
    pub async fn set_torque(&self, id: Id, enabled: bool) -> Result<Ack, Error<C::Error>> {
        self.0.lock().await.set_torque(id, enabled).await
    }

    #[inline]
    pub async fn read_position_speed(
        &self,
        id: Id,
    ) -> Result<ServoReading, Error<C::Error, ServoReading>> {
        self.0.lock().await.read_position_speed(id).await
    }

    /// For background pollers: with `Acquire::Skip`,
    /// a busy link yields `Polled::Skipped` instead of waiting.
    #[inline]
    pub async fn poll_position_speed(
        &self,
        id: Id,
        acquire: Acquire,
    ) -> Result<Polled<ServoReading>, Error<C::Error, ServoReading>> {
        match acquire {
            Acquire::Blocking => self.read_position_speed(id).await.map(Polled::Done),
            Acquire::Skip => {
                let Some(mut bus) = self.0.try_lock() else {
                    log::trace!("Servo {id}: link busy, skipping poll");
                    return Ok(Polled::Skipped);
                };
                bus.read_position_speed(id).await.map(Polled::Done)
            }
        }
    }

    #[inline]
    pub async fn set_pid(&self, id: Id, pid: Pid) -> Result<Ack, Error<C::Error>> {
        self.0.lock().await.set_pid(id, pid).await
    }

    #[inline]
    pub async fn read_pid(&self, id: Id) -> Result<Pid, Error<C::Error, Pid>> {
        self.0.lock().await.read_pid(id).await
    }

    #[inline]
    pub async fn read_status(&self, id: Id) -> Result<Fault, Error<C::Error, Fault>> {
        self.0.lock().await.read_status(id).await
    }

    #[inline]
    pub async fn unlock(&self, id: Id) -> Result<Ack, Error<C::Error>> {
        self.0.lock().await.unlock(id).await
    }

    #[inline]
    pub async fn lock(&self, id: Id) -> Result<Ack, Error<C::Error>> {
        self.0.lock().await.lock(id).await
    }

    #[inline]
    pub async fn reconfigure(
        &self,
        id: Id,
        configuration: Configuration,
    ) -> Result<(), Error<C::Error>> {
        self.0.lock().await.reconfigure(id, configuration).await
    }

    #[inline]
    pub async fn change_id(&self, old: Id, new: Id) -> Result<Ping, Error<C::Error>> {
        self.0.lock().await.change_id(old, new).await
    }

    #[inline]
    pub async fn load_limits(&self, id: Id) -> Result<Limits, Error<C::Error, Limits>> {
        self.0.lock().await.load_limits(id).await
    }

    #[inline]
    pub async fn stage(&self, id: Id) -> Stage {
        self.0.lock().await.stage(id)
    }

    /// Disables torque on every servo this link has written to, then closes the transport.
    /// A servo that fails to respond is logged and skipped.
    #[inline]
    pub async fn shutdown(self) -> Result<(), Error<C::Error>> {
        for raw in 0..=MAX_ID {
            let Ok(id) = Id::new(raw) else {
                continue;
            };
            let mut bus = self.0.lock().await;
            if !bus.was_commanded(id) {
                continue;
            }
            match bus.set_torque(id, false).await {
                Ok(Ack::Received) => log::debug!("Servo {id}: torque disabled"),
                Ok(Ack::Missing) => log::warn!("Servo {id}: torque-off not acknowledged"),
                Err(Error::Fault(Faulted { flags, .. })) => {
                    log::warn!("Servo {id}: torque disabled, but the servo reports {flags}")
                }
                Err(e) => log::error!("Servo {id}: could not disable torque: {e}"),
            }
        }
        self.0.lock().await.close().await
    }
}
