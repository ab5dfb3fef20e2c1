use sts_packet::{
    constants::Id,
    control_table::{GoalPosition, Item},
    instruction::Instruction,
    packet,
    sign_magnitude::to_wire,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let id = Id::new(1)?;
    let goal = to_wire(2048).ok_or("goal out of range")?;
    let speed = to_wire(500).ok_or("speed out of range")?;
    let [goal_lo, goal_hi] = goal.to_le_bytes();
    let [speed_lo, speed_hi] = speed.to_le_bytes();
    let value = [goal_lo, goal_hi, speed_lo, speed_hi];
    let frame = packet::new(id, &Instruction::write_block(GoalPosition::ADDRESS, &value))?;
    println!("{:02X?}", frame.as_buffer());
    Ok(())
}
