//! Reset, halt and resume commands

use riotee_core::target::Target;

/// Execution control action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Reset,
    Halt,
    Resume,
}

pub fn run_control(
    target: &mut dyn Target,
    action: Action,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        Action::Reset => target.reset()?,
        Action::Halt => target.halt()?,
        Action::Resume => target.resume()?,
    }
    println!("{:?}: OK", action);
    Ok(())
}
