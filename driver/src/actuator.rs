use {
    crate::{
        Error,
        bus::{Bus, Configuration, Stage},
        comm::Comm,
        link::{Acquire, Link, Polled},
        mutex::Mutex,
    },
    paste::paste,
    sts_packet::{
        Ack, Fault, Id, Limits, Pid, Ping, ServoReading,
        control_table::{self, Item},
    },
};

macro_rules! control_table_methods {
    ($item:ident) => {
        paste! {
            #[inline]
            pub async fn [< read_ $item:snake >](&self) -> Result<u16, Error<C::Error, u16>> {
                self.link
                    .read(self.id, <control_table::$item as Item>::REGISTER)
                    .await
            }

            #[inline]
            pub async fn [< write_ $item:snake >](
                &self,
                value: u16,
            ) -> Result<Ack, Error<C::Error>> {
                self.link
                    .write(self.id, <control_table::$item as Item>::REGISTER, value)
                    .await
            }
        }
    };
}

/// One servo on a shared link.
pub struct Servo<'link, M> {
    link: &'link Link<M>,
    id: Id,
}

impl<M> Clone for Servo<'_, M> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Servo<'_, M> {}

impl<'link, C: Comm, M: Mutex<Item = Bus<C>>> Servo<'link, M> {
    #[inline(always)]
    pub const fn new(link: &'link Link<M>, id: Id) -> Self {
        Self { link, id }
    }

    #[inline(always)]
    pub const fn id(&self) -> Id {
        self.id
    }

    #[inline(always)]
    pub async fn ping(&self) -> Result<Ping, Error<C::Error, Ping>> {
        self.link.ping(self.id).await
    }

    #[inline(always)]
    pub async fn set_position(
        &self,
        goal: i32,
        speed: i32,
        acceleration: u8,
    ) -> Result<Ack, Error<C::Error>> {
        self.link
            .set_position(self.id, goal, speed, acceleration)
            .await
    }

    #[inline(always)]
    pub async fn set_torque(&self, enabled: bool) -> Result<Ack, Error<C::Error>> {
        self.link.set_torque(self.id, enabled).await
    }

    #[inline(always)]
    pub async fn read_position_speed(&self) -> Result<ServoReading, Error<C::Error, ServoReading>> {
        self.link.read_position_speed(self.id).await
    }

    #[inline(always)]
    pub async fn poll_position_speed(
        &self,
        acquire: Acquire,
    ) -> Result<Polled<ServoReading>, Error<C::Error, ServoReading>> {
        self.link.poll_position_speed(self.id, acquire).await
    }

    #[inline(always)]
    pub async fn set_pid(&self, pid: Pid) -> Result<Ack, Error<C::Error>> {
        self.link.set_pid(self.id, pid).await
    }

    #[inline(always)]
    pub async fn read_pid(&self) -> Result<Pid, Error<C::Error, Pid>> {
        self.link.read_pid(self.id).await
    }

    #[inline(always)]
    pub async fn read_status(&self) -> Result<Fault, Error<C::Error, Fault>> {
        self.link.read_status(self.id).await
    }

    #[inline(always)]
    pub async fn unlock(&self) -> Result<Ack, Error<C::Error>> {
        self.link.unlock(self.id).await
    }

    #[inline(always)]
    pub async fn lock(&self) -> Result<Ack, Error<C::Error>> {
        self.link.lock(self.id).await
    }

    #[inline(always)]
    pub async fn reconfigure(&self, configuration: Configuration) -> Result<(), Error<C::Error>> {
        self.link.reconfigure(self.id, configuration).await
    }

    #[inline(always)]
    pub async fn load_limits(&self) -> Result<Limits, Error<C::Error, Limits>> {
        self.link.load_limits(self.id).await
    }

    #[inline(always)]
    pub async fn stage(&self) -> Stage {
        self.link.stage(self.id).await
    }

    control_table_methods!(ModelNumber);
    control_table_methods!(Id);
    control_table_methods!(BaudRate);
    control_table_methods!(MinAngleLimit);
    control_table_methods!(MaxAngleLimit);
    control_table_methods!(Mode);
    control_table_methods!(TorqueEnable);
    control_table_methods!(Acceleration);
    control_table_methods!(GoalPosition);
    control_table_methods!(GoalTime);
    control_table_methods!(GoalSpeed);
    control_table_methods!(PidP);
    control_table_methods!(PidI);
    control_table_methods!(PidD);
    control_table_methods!(Lock);
    control_table_methods!(PresentPosition);
    control_table_methods!(PresentSpeed);
    control_table_methods!(PresentLoad);
    control_table_methods!(PresentVoltage);
    control_table_methods!(PresentTemperature);
    control_table_methods!(Moving);
}
