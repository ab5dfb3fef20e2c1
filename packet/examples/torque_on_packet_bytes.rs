use sts_packet::{
    constants::Id,
    control_table::{Item, TorqueEnable},
    instruction::Instruction,
    packet,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let frame = packet::new(Id::new(1)?, &Instruction::write(TorqueEnable::REGISTER, 1)?)?;
    println!("{:02X?}", frame.as_buffer());
    Ok(())
}
