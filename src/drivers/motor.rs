//! Motor driver collaborator trait and drive capability wrapper

use crate::error::Result;
use crate::types::{Direction, MotorCommand, Side};

/// PWM/motor collaborator. Open-loop: no feedback channel is assumed.
pub trait MotorDriver: Send {
    /// Apply a normalized speed (0-100) and direction to one side
    fn set_speed(&mut self, side: Side, speed: f32, direction: Direction) -> Result<()>;

    /// Stop all motors immediately
    fn stop_all(&mut self) -> Result<()>;
}

/// Physical drive layout, selected at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveLayout {
    /// One motor, single side actuated
    Single,
    /// Two motors driven with the same command
    Dual,
}

/// Capability wrapper mapping one balance command onto the configured
/// drive layout.
pub struct Drive {
    driver: Box<dyn MotorDriver>,
    layout: DriveLayout,
}

impl Drive {
    /// Single-motor drive
    pub fn single(driver: Box<dyn MotorDriver>) -> Self {
        Self {
            driver,
            layout: DriveLayout::Single,
        }
    }

    /// Dual-motor differential drive, both sides commanded identically
    pub fn dual(driver: Box<dyn MotorDriver>) -> Self {
        Self {
            driver,
            layout: DriveLayout::Dual,
        }
    }

    /// Configured layout
    pub fn layout(&self) -> DriveLayout {
        self.layout
    }

    /// Apply one cycle's command to every configured side
    pub fn apply(&mut self, command: &MotorCommand) -> Result<()> {
        match self.layout {
            DriveLayout::Single => {
                self.driver
                    .set_speed(Side::Left, command.speed, command.direction)?;
            }
            DriveLayout::Dual => {
                self.driver
                    .set_speed(Side::Left, command.speed, command.direction)?;
                self.driver
                    .set_speed(Side::Right, command.speed, command.direction)?;
            }
        }
        Ok(())
    }

    /// Stop all sides immediately
    pub fn stop(&mut self) -> Result<()> {
        self.driver.stop_all()
    }
}
