//! Motor command mapper
//!
//! Maps a signed control output onto a (speed, direction) pair. Speeds
//! under the motor deadband stop the motor instead of buzzing it below its
//! static-friction threshold, and a direction flip gets a configurable
//! speed boost to punch through backlash and inertia. Deterministic given
//! (output, last_direction, config).

use crate::config::BalanceConfig;
use crate::types::{Direction, MotorCommand};

/// Stateless aside from the last applied non-stop direction
#[derive(Debug)]
pub struct MotorMapper {
    last_direction: Direction,
}

impl Default for MotorMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorMapper {
    pub fn new() -> Self {
        Self {
            last_direction: Direction::Stop,
        }
    }

    /// Last applied non-stop direction, `Stop` before the first command
    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    /// Forget the direction memory. Runs on session (re)start.
    pub fn clear(&mut self) {
        self.last_direction = Direction::Stop;
    }

    /// Map one control output to a motor command
    pub fn map(&mut self, output: f32, params: &BalanceConfig) -> MotorCommand {
        let output = output.clamp(-100.0, 100.0);
        let direction = if output > 0.0 {
            Direction::Forward
        } else {
            Direction::Reverse
        };

        let mut speed = output.abs().min(params.max_motor_speed);
        if speed < params.zero_threshold {
            speed = 0.0;
        }

        if speed < params.motor_deadband {
            // Below static friction: stop rather than buzz. Direction
            // memory is untouched so a later flip still gets the boost.
            return MotorCommand::stop();
        }

        if self.last_direction != Direction::Stop && direction != self.last_direction {
            let boosted = speed * (1.0 + params.direction_change_boost / 100.0);
            speed = boosted.min(params.max_motor_speed).min(100.0);
        }

        self.last_direction = direction;
        MotorCommand { speed, direction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(deadband: f32, boost: f32) -> BalanceConfig {
        let mut config = BalanceConfig::default();
        config.motor_deadband = deadband;
        config.direction_change_boost = boost;
        config.max_motor_speed = 100.0;
        config
    }

    #[test]
    fn test_below_deadband_stops() {
        let mut mapper = MotorMapper::new();
        let config = config(60.0, 10.0);

        let command = mapper.map(55.0, &config);
        assert_eq!(command.speed, 0.0);
        assert_eq!(command.direction, Direction::Stop);
        assert_eq!(mapper.last_direction(), Direction::Stop);
    }

    #[test]
    fn test_sign_selects_direction() {
        let mut mapper = MotorMapper::new();
        let config = config(0.0, 0.0);

        assert_eq!(mapper.map(70.0, &config).direction, Direction::Forward);
        assert_eq!(mapper.map(-70.0, &config).direction, Direction::Reverse);
    }

    #[test]
    fn test_speed_bounded() {
        let mut mapper = MotorMapper::new();
        let config = config(0.0, 0.0);

        for output in [-250.0, -100.0, -3.0, 0.0, 42.0, 100.0, 500.0] {
            let command = mapper.map(output, &config);
            assert!(command.speed >= 0.0);
            assert!(command.speed <= 100.0);
        }
    }

    #[test]
    fn test_direction_flip_boosts() {
        let mut mapper = MotorMapper::new();
        let config = config(10.0, 20.0);

        let first = mapper.map(50.0, &config);
        assert_eq!(first.speed, 50.0);
        assert_eq!(first.direction, Direction::Forward);

        // Flip: 50 * 1.2 = 60
        let second = mapper.map(-50.0, &config);
        assert_eq!(second.direction, Direction::Reverse);
        assert!((second.speed - 60.0).abs() < 1e-4);

        // Same direction again: no boost
        let third = mapper.map(-50.0, &config);
        assert_eq!(third.speed, 50.0);
    }

    #[test]
    fn test_boost_clamped_to_hundred() {
        let mut mapper = MotorMapper::new();
        let config = config(10.0, 50.0);

        mapper.map(90.0, &config);
        let flipped = mapper.map(-90.0, &config);
        // min(100, 90 * 1.5)
        assert_eq!(flipped.speed, 100.0);
    }

    #[test]
    fn test_no_boost_from_stop() {
        let mut mapper = MotorMapper::new();
        let config = config(10.0, 30.0);

        // First non-stop command after start: no previous direction to flip from
        let command = mapper.map(-40.0, &config);
        assert_eq!(command.speed, 40.0);
    }

    #[test]
    fn test_stop_preserves_direction_memory() {
        let mut mapper = MotorMapper::new();
        let config = config(30.0, 10.0);

        mapper.map(80.0, &config);
        assert_eq!(mapper.last_direction(), Direction::Forward);

        // Deadband stop in between does not clear the memory
        mapper.map(5.0, &config);
        assert_eq!(mapper.last_direction(), Direction::Forward);

        let flipped = mapper.map(-80.0, &config);
        assert!((flipped.speed - 88.0).abs() < 1e-4);
    }

    #[test]
    fn test_max_motor_speed_caps_output() {
        let mut mapper = MotorMapper::new();
        let mut config = config(10.0, 0.0);
        config.max_motor_speed = 70.0;

        let command = mapper.map(95.0, &config);
        assert_eq!(command.speed, 70.0);
    }

    #[test]
    fn test_clear_resets_memory() {
        let mut mapper = MotorMapper::new();
        let config = config(10.0, 25.0);

        mapper.map(60.0, &config);
        mapper.clear();
        let command = mapper.map(-60.0, &config);
        // No boost after clear
        assert_eq!(command.speed, 60.0);
    }
}
