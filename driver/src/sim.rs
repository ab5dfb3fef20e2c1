//! In-memory servos on a fake bus, answering the way STS firmware does.

use {
    crate::{bus::Bus, comm::Comm, link::Link},
    core::{fmt, time::Duration},
    embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex,
    std::{
        collections::BTreeMap,
        sync::{Arc, Mutex},
    },
    sts_packet::{
        checksum,
        constants::{INSTRUCTION_PING, INSTRUCTION_READ, INSTRUCTION_WRITE},
        control_table::{self, Item},
        packet,
    },
};

pub type TestLink = Link<embassy_sync::mutex::Mutex<CriticalSectionRawMutex, Bus<Device>>>;

pub const MODEL_NUMBER: u16 = 777;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Sent {
        id: u8,
        instruction: u8,
        parameters: Vec<u8>,
    },
    Replied {
        id: u8,
    },
    Closed,
}

#[derive(Clone, Debug)]
pub struct Memory {
    pub table: [u8; 256],
    pub fault: u8,
    /// Never answers anything.
    pub silent: bool,
    /// Applies writes but does not acknowledge them.
    pub silent_on_write: bool,
    /// Flips a bit in the checksum of every reply.
    pub corrupt: bool,
    /// Leaves the model number out of ping replies.
    pub terse_ping: bool,
    /// Stops every reply after this many bytes.
    pub truncate_after: Option<usize>,
    /// Puts this ID in every reply instead of its own.
    pub reply_as: Option<u8>,
    /// Acknowledges a change of ID from the new ID.
    pub ack_id_change_from_new: bool,
}

impl Memory {
    pub fn new(id: u8) -> Self {
        let mut table = [0; 256];
        table[usize::from(control_table::ModelNumber::ADDRESS)..][..2]
            .copy_from_slice(&MODEL_NUMBER.to_le_bytes());
        table[usize::from(control_table::Id::ADDRESS)] = id;
        table[usize::from(control_table::MaxAngleLimit::ADDRESS)..][..2]
            .copy_from_slice(&4095_u16.to_le_bytes());
        table[usize::from(control_table::PidP::ADDRESS)] = 32;
        table[usize::from(control_table::PidD::ADDRESS)] = 32;
        table[usize::from(control_table::Lock::ADDRESS)] = 1;
        Self {
            table,
            fault: 0,
            silent: false,
            silent_on_write: false,
            corrupt: false,
            terse_ping: false,
            truncate_after: None,
            reply_as: None,
            ack_id_change_from_new: false,
        }
    }

    pub fn word(&self, address: u8) -> u16 {
        let i = usize::from(address);
        u16::from_le_bytes([self.table[i], self.table[i + 1]])
    }

    fn eeprom_locked(&self, address: u8) -> bool {
        let protected = [
            control_table::Id::REGISTER,
            control_table::BaudRate::REGISTER,
            control_table::MinAngleLimit::REGISTER,
            control_table::MaxAngleLimit::REGISTER,
            control_table::Mode::REGISTER,
        ]
        .iter()
        .any(|register| {
            (register.address..register.address + register.width.bytes() as u8).contains(&address)
        });
        protected && self.table[usize::from(control_table::Lock::ADDRESS)] != 0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Unplugged;

impl fmt::Display for Unplugged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the simulated bus was closed")
    }
}

/// Clones share servos and the event log, so tests can watch a device a link owns.
#[derive(Clone, Default)]
pub struct Device {
    servos: Arc<Mutex<BTreeMap<u8, Memory>>>,
    events: Arc<Mutex<Vec<Event>>>,
    pending: Vec<u8>,
    pending_id: u8,
    closed: bool,
}

impl Device {
    pub fn with_servos(ids: &[u8]) -> Self {
        let device = Self::default();
        for &id in ids {
            let _ = device.servos.lock().unwrap().insert(id, Memory::new(id));
        }
        device
    }

    pub fn link(&self) -> TestLink {
        Link::new(Bus::new(self.clone(), Duration::from_millis(20)))
    }

    pub fn memory(&self, id: u8) -> Option<Memory> {
        self.servos.lock().unwrap().get(&id).cloned()
    }

    pub fn update(&self, id: u8, f: impl FnOnce(&mut Memory)) {
        f(self.servos.lock().unwrap().get_mut(&id).unwrap())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(u8, u8, Vec<u8>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Sent {
                    id,
                    instruction,
                    parameters,
                } => Some((id, instruction, parameters)),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.sent()
            .iter()
            .filter(|&&(_, instruction, _)| instruction == INSTRUCTION_WRITE)
            .count()
    }

    fn respond(&self, id: u8, instruction: u8, parameters: &[u8]) -> Vec<u8> {
        let mut servos = self.servos.lock().unwrap();
        let Some(memory) = servos.get_mut(&id) else {
            return vec![];
        };
        if memory.silent {
            return vec![];
        }
        let (reply, moved_to) = match instruction {
            INSTRUCTION_PING if memory.terse_ping => (vec![], None),
            INSTRUCTION_PING => (MODEL_NUMBER.to_le_bytes().to_vec(), None),
            INSTRUCTION_READ => {
                let &[address, length] = parameters else {
                    panic!("read with parameters {parameters:02X?}")
                };
                let start = usize::from(address);
                (memory.table[start..start + usize::from(length)].to_vec(), None)
            }
            INSTRUCTION_WRITE => {
                let (&address, value) = parameters.split_first().unwrap();
                for (offset, &byte) in value.iter().enumerate() {
                    let address = address + offset as u8;
                    if !memory.eeprom_locked(address) {
                        memory.table[usize::from(address)] = byte;
                    }
                }
                let id_now = memory.table[usize::from(control_table::Id::ADDRESS)];
                if memory.silent_on_write {
                    return vec![];
                }
                (vec![], (id_now != id).then_some(id_now))
            }
            other => panic!("unsupported instruction x{other:02X}"),
        };
        let fault = memory.fault;
        let corrupt = memory.corrupt;
        let truncate_after = memory.truncate_after;
        let reply_id = match moved_to {
            Some(new) if memory.ack_id_change_from_new => new,
            _ => memory.reply_as.unwrap_or(id),
        };
        if let Some(new) = moved_to {
            let memory = servos.remove(&id).unwrap();
            let _ = servos.insert(new, memory);
        }
        let mut raw = vec![0xFF, 0xFF, reply_id, reply.len() as u8 + 2, fault];
        raw.extend_from_slice(&reply);
        raw.push(checksum(&raw[2..]) ^ u8::from(corrupt));
        if let Some(length) = truncate_after {
            raw.truncate(length);
        }
        raw
    }
}

impl Comm for Device {
    type Error = Unplugged;

    async fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.closed {
            return Err(Unplugged);
        }
        let view = packet::view(bytes).expect("malformed instruction packet");
        self.events.lock().unwrap().push(Event::Sent {
            id: view.id,
            instruction: view.byte,
            parameters: view.parameters.to_vec(),
        });
        self.pending = self.respond(view.id, view.byte, view.parameters);
        self.pending_id = view.id;
        Ok(())
    }

    async fn recv(&mut self, buffer: &mut [u8], _timeout: Duration) -> Result<usize, Self::Error> {
        if self.closed {
            return Err(Unplugged);
        }
        let n = buffer.len().min(self.pending.len());
        buffer[..n].copy_from_slice(&self.pending[..n]);
        let _ = self.pending.drain(..n);
        if n > 0 && self.pending.is_empty() {
            self.events.lock().unwrap().push(Event::Replied {
                id: self.pending_id,
            });
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        if !self.closed {
            self.closed = true;
            self.events.lock().unwrap().push(Event::Closed);
        }
        Ok(())
    }
}
