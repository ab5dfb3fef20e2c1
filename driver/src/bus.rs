use {
    crate::{Error, Faulted, InvalidParameter, comm::Comm},
    core::time::Duration,
    sts_packet::{
        Ack, Fault, Id, Instruction, Limits, Pid, Ping, Receive, ServoReading, Status,
        constants::{MAX_FRAME_BYTES, MAX_ID, MAX_PARAMETERS},
        control_table::{
            self, GOAL_BLOCK, Item, LIMITS_BLOCK, Lock, MaxAngleLimit, MinAngleLimit, Mode,
            OperatingMode, PID_BLOCK, PRESENT_BLOCK, Register, TorqueEnable, Width,
        },
        packet::{
            self,
            recv::{Framing, Mismatch8},
            send::TooManyParameters,
        },
        recv::{self, OutOfRange},
        sign_magnitude::{WORD_MAGNITUDE_MAX, to_wire},
    },
};

/// Header, ID, and length: enough to know how much more to wait for.
const PREFIX_BYTES: usize = 4;

/// Where a servo is in its lifecycle, as far as this link has seen.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    Unconfigured,
    /// Mode and limits written and locked, torque untouched since.
    Configured,
    TorqueEnabled,
    TorqueDisabled,
}

/// Operating mode and angle limits, written together by `Bus::reconfigure`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Configuration {
    pub mode: OperatingMode,
    pub limits: Limits,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ServoState {
    limits: Option<Limits>,
    torque: Option<bool>,
    configured: bool,
    commanded: bool,
}

impl ServoState {
    const UNKNOWN: Self = Self {
        limits: None,
        torque: None,
        configured: false,
        commanded: false,
    };

    #[inline]
    const fn stage(&self) -> Stage {
        match self.torque {
            Some(true) => Stage::TorqueEnabled,
            Some(false) => Stage::TorqueDisabled,
            None if self.configured => Stage::Configured,
            None => Stage::Unconfigured,
        }
    }
}

/// Sole owner of the transport: one exchange at a time, plus what it has learned about each servo.
pub struct Bus<C: Comm> {
    comm: C,
    timeout: Duration,
    servos: [ServoState; MAX_ID as usize + 1],
    closed: bool,
}

impl<C: Comm> Bus<C> {
    #[inline(always)]
    pub const fn new(comm: C, timeout: Duration) -> Self {
        Self {
            comm,
            timeout,
            servos: [ServoState::UNKNOWN; MAX_ID as usize + 1],
            closed: false,
        }
    }

    #[inline(always)]
    fn state(&self, id: Id) -> &ServoState {
        &self.servos[usize::from(id.get())]
    }

    #[inline(always)]
    fn state_mut(&mut self, id: Id) -> &mut ServoState {
        &mut self.servos[usize::from(id.get())]
    }

    #[inline(always)]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub fn stage(&self, id: Id) -> Stage {
        self.state(id).stage()
    }

    /// Angle limits last read or written through this link.
    #[inline]
    pub fn cached_limits(&self, id: Id) -> Option<Limits> {
        self.state(id).limits
    }

    /// Whether anything was written to this servo through this link.
    #[inline]
    pub fn was_commanded(&self, id: Id) -> bool {
        self.state(id).commanded
    }

    /// Write one frame, then read and validate the reply.
    #[inline]
    pub async fn exchange<Output>(
        &mut self,
        id: Id,
        instruction: &Instruction<'_>,
        decode: impl FnOnce(&Status<'_>) -> Result<Output, Framing>,
    ) -> Result<Output, Error<C::Error, Output>> {
        if self.closed {
            return Err(Error::Closed);
        }
        let frame = packet::new(id, instruction).map_err(InvalidParameter::TooManyParameters)?;
        log::debug!("Servo {id}: {instruction:?}");
        log::trace!("-> {:02X?}", frame.as_buffer());
        self.comm.send(&frame).await.map_err(Error::Io)?;

        let mut raw = [0; MAX_FRAME_BYTES];
        let mut received = self
            .comm
            .recv(&mut raw[..PREFIX_BYTES], self.timeout)
            .await
            .map_err(Error::Io)?;
        if received == 0 {
            log::debug!("Servo {id}: no response");
            return Err(Error::NoResponse { id: id.get() });
        }
        if received == PREFIX_BYTES {
            let remaining = usize::from(raw[PREFIX_BYTES - 1]);
            received += self
                .comm
                .recv(
                    &mut raw[PREFIX_BYTES..PREFIX_BYTES + remaining],
                    self.timeout,
                )
                .await
                .map_err(Error::Io)?;
        }
        let raw = &raw[..received];
        log::trace!("<- {raw:02X?}");

        let status = packet::parse(raw)?;
        status.expect_id(id.get()).map_err(recv::Error::from)?;
        let output = decode(&status).map_err(recv::Error::from);
        if !status.fault.is_clear() {
            log::debug!("Servo {id}: {}", status.fault);
            return Err(Error::Fault(Faulted {
                id: id.get(),
                flags: status.fault,
                output: output.ok(),
            }));
        }
        Ok(output?)
    }

    #[inline(always)]
    pub async fn request<R: Receive>(
        &mut self,
        id: Id,
        instruction: &Instruction<'_>,
    ) -> Result<R, Error<C::Error, R>> {
        self.exchange(id, instruction, R::receive).await
    }

    /// Silence after a write is not an error: the servo may be configured not to answer.
    async fn write_instruction(
        &mut self,
        id: Id,
        instruction: &Instruction<'_>,
    ) -> Result<Ack, Error<C::Error>> {
        let result = match self.request::<Ack>(id, instruction).await {
            Err(Error::NoResponse { id }) => {
                log::warn!("Servo {id} did not acknowledge a write");
                Ok(Ack::Missing)
            }
            other => other.map_err(Error::forget),
        };
        if !matches!(
            result,
            Err(Error::Closed | Error::InvalidParameter(_) | Error::Io(_))
        ) {
            self.state_mut(id).commanded = true;
        }
        result
    }

    /// Writes that reached the servo, acknowledged or faulted, update what this link knows.
    async fn write_observed(
        &mut self,
        id: Id,
        instruction: &Instruction<'_>,
        address: u8,
        bytes: &[u8],
    ) -> Result<Ack, Error<C::Error>> {
        let result = self.write_instruction(id, instruction).await;
        if matches!(result, Ok(_) | Err(Error::Fault(_))) {
            self.observe_write(id, address, bytes);
        }
        result
    }

    #[inline]
    fn observe_write(&mut self, id: Id, address: u8, bytes: &[u8]) {
        let start = usize::from(address);
        let written = start..start + bytes.len();
        let state = self.state_mut(id);
        let torque = usize::from(TorqueEnable::ADDRESS);
        if written.contains(&torque) {
            state.torque = Some(bytes[torque - start] != 0);
        }
        let limits = usize::from(LIMITS_BLOCK.address);
        if written.start < limits + usize::from(LIMITS_BLOCK.length) && limits < written.end {
            state.limits = None;
        }
    }

    #[inline]
    pub async fn ping(&mut self, id: Id) -> Result<Ping, Error<C::Error, Ping>> {
        self.request(id, &Instruction::Ping).await
    }

    #[inline]
    pub async fn read(&mut self, id: Id, register: Register) -> Result<u16, Error<C::Error, u16>> {
        let instruction = Instruction::read(register);
        match register.width {
            Width::Byte => self
                .request::<u8>(id, &instruction)
                .await
                .map(u16::from)
                .map_err(|e| e.map(u16::from)),
            Width::Word => self.request::<u16>(id, &instruction).await,
        }
    }

    #[inline]
    pub async fn write(
        &mut self,
        id: Id,
        register: Register,
        value: u16,
    ) -> Result<Ack, Error<C::Error>> {
        let instruction = Instruction::write(register, value).map_err(InvalidParameter::Value)?;
        let bytes = value.to_le_bytes();
        self.write_observed(
            id,
            &instruction,
            register.address,
            &bytes[..register.width.bytes()],
        )
        .await
    }

    /// Write, then read the register back.
    #[inline]
    pub async fn write_verified(
        &mut self,
        id: Id,
        register: Register,
        value: u16,
    ) -> Result<(), Error<C::Error>> {
        let _ack = self.write(id, register, value).await?;
        let actual = self.read(id, register).await.map_err(Error::forget)?;
        if actual != value {
            return Err(Error::Verification {
                expected: value,
                actual,
            });
        }
        Ok(())
    }

    /// Reads `buffer.len()` consecutive bytes starting at `address`.
    #[inline]
    pub async fn read_block(
        &mut self,
        id: Id,
        address: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error<C::Error>> {
        let count = buffer.len();
        let length = u8::try_from(count)
            .ok()
            .filter(|&length| usize::from(length) <= MAX_PARAMETERS)
            .ok_or(InvalidParameter::TooManyParameters(TooManyParameters {
                count,
            }))?;
        self.exchange(id, &Instruction::Read { address, length }, |status| {
            if status.parameters.len() != count {
                return Err(Framing::WrongParameterCount {
                    expected: count,
                    actual: status.parameters.len(),
                });
            }
            buffer.copy_from_slice(status.parameters);
            Ok(())
        })
        .await
    }

    #[inline]
    pub async fn write_block(
        &mut self,
        id: Id,
        address: u8,
        bytes: &[u8],
    ) -> Result<Ack, Error<C::Error>> {
        self.write_observed(id, &Instruction::write_block(address, bytes), address, bytes)
            .await
    }

    /// Acceleration, goal, and speed in one write.
    /// The goal is checked against the servo's angle limits,
    /// read first if this link has none cached.
    /// Nothing is written when the check fails.
    #[inline]
    pub async fn set_position(
        &mut self,
        id: Id,
        goal: i32,
        speed: i32,
        acceleration: u8,
    ) -> Result<Ack, Error<C::Error>> {
        let goal_raw = to_wire(goal).ok_or(OutOfRange {
            value: goal,
            min: -i32::from(WORD_MAGNITUDE_MAX),
            max: i32::from(WORD_MAGNITUDE_MAX),
        })?;
        let speed_raw = to_wire(speed).ok_or(InvalidParameter::Speed { speed })?;
        let limits = match self.state(id).limits {
            Some(limits) => limits,
            None => match self.load_limits(id).await {
                Ok(limits) | Err(Error::Fault(Faulted { output: Some(limits), .. })) => limits,
                Err(e) => return Err(e.forget()),
            },
        };
        limits.check(goal)?;
        if self.state(id).torque == Some(false) {
            log::warn!("Servo {id}: moving to {goal} with torque disabled");
        }
        let [goal_lo, goal_hi] = goal_raw.to_le_bytes();
        let [speed_lo, speed_hi] = speed_raw.to_le_bytes();
        // Goal time (two bytes) sits between position and speed; zero lets speed govern.
        let block = [acceleration, goal_lo, goal_hi, 0, 0, speed_lo, speed_hi];
        self.write_block(id, GOAL_BLOCK.address, &block).await
    }

    #[inline]
    pub async fn set_torque(&mut self, id: Id, enabled: bool) -> Result<Ack, Error<C::Error>> {
        self.write(id, TorqueEnable::REGISTER, u16::from(enabled))
            .await
    }

    #[inline]
    pub async fn read_position_speed(
        &mut self,
        id: Id,
    ) -> Result<ServoReading, Error<C::Error, ServoReading>> {
        self.request(id, &Instruction::read_block(PRESENT_BLOCK))
            .await
    }

    #[inline]
    pub async fn set_pid(&mut self, id: Id, pid: Pid) -> Result<Ack, Error<C::Error>> {
        self.write_block(id, PID_BLOCK.address, &pid.to_bytes())
            .await
    }

    #[inline]
    pub async fn read_pid(&mut self, id: Id) -> Result<Pid, Error<C::Error, Pid>> {
        self.request(id, &Instruction::read_block(PID_BLOCK)).await
    }

    #[inline]
    pub async fn read_status(&mut self, id: Id) -> Result<Fault, Error<C::Error, Fault>> {
        self.request::<u8>(id, &Instruction::read(control_table::Status::REGISTER))
            .await
            .map(Fault)
            .map_err(|e| e.map(Fault))
    }

    /// Allows EEPROM writes until `lock`.
    #[inline]
    pub async fn unlock(&mut self, id: Id) -> Result<Ack, Error<C::Error>> {
        self.write(id, Lock::REGISTER, 0).await
    }

    #[inline]
    pub async fn lock(&mut self, id: Id) -> Result<Ack, Error<C::Error>> {
        self.write(id, Lock::REGISTER, 1).await
    }

    /// Torque off, then mode and limits inside one unlock/lock bracket.
    /// The lock is written again even if a write inside the bracket failed.
    #[inline]
    pub async fn reconfigure(
        &mut self,
        id: Id,
        configuration: Configuration,
    ) -> Result<(), Error<C::Error>> {
        let [min, max] = configuration.limits.to_wire()?;
        let _ack = self.set_torque(id, false).await?;
        let _ack = self.unlock(id).await?;
        let written = self.write_configuration(id, configuration.mode, min, max).await;
        let relocked = self.lock(id).await;
        let () = written?;
        let _ack = relocked?;
        let state = self.state_mut(id);
        state.limits = Some(configuration.limits);
        state.configured = true;
        // Reported as configured until torque is next written.
        state.torque = None;
        log::info!(
            "Servo {id}: {} mode, limits {}",
            configuration.mode,
            configuration.limits
        );
        Ok(())
    }

    async fn write_configuration(
        &mut self,
        id: Id,
        mode: OperatingMode,
        min: u16,
        max: u16,
    ) -> Result<(), Error<C::Error>> {
        let _ack = self.write(id, Mode::REGISTER, mode as u16).await?;
        let _ack = self.write(id, MinAngleLimit::REGISTER, min).await?;
        let _ack = self.write(id, MaxAngleLimit::REGISTER, max).await?;
        Ok(())
    }

    /// Moves a servo to a new ID and pings it there.
    #[inline]
    pub async fn change_id(&mut self, old: Id, new: Id) -> Result<Ping, Error<C::Error>> {
        let _ack = self.unlock(old).await?;
        match self
            .write(old, control_table::Id::REGISTER, u16::from(new.get()))
            .await
        {
            Ok(_) => {}
            // Some firmware answers from the new ID already.
            Err(Error::Protocol(recv::Error::Framing(Framing::WrongId(Mismatch8 {
                actual,
                ..
            })))) if actual == new.get() => {}
            Err(e) => {
                if let Err(relock) = self.lock(old).await {
                    log::error!("Servo {old}: could not re-lock EEPROM: {relock}");
                }
                return Err(e);
            }
        }
        if old != new {
            self.servos[usize::from(new.get())] = *self.state(old);
            *self.state_mut(old) = ServoState::UNKNOWN;
        }
        let _ack = self.lock(new).await?;
        log::info!("Servo {old} is now servo {new}");
        self.ping(new).await.map_err(Error::forget)
    }

    /// Reads both angle limits and remembers them for `set_position`, even from a faulted reply.
    #[inline]
    pub async fn load_limits(&mut self, id: Id) -> Result<Limits, Error<C::Error, Limits>> {
        let result = self
            .request::<Limits>(id, &Instruction::read_block(LIMITS_BLOCK))
            .await;
        if let Ok(limits) | Err(Error::Fault(Faulted { output: Some(limits), .. })) = result {
            self.state_mut(id).limits = Some(limits);
        }
        result
    }

    /// Idempotent.
    #[inline]
    pub async fn close(&mut self) -> Result<(), Error<C::Error>> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        log::debug!("Closing the serial link");
        self.comm.close().await.map_err(Error::Io)
    }
}
