//! Edge-triggered simulation band state machine
//!
//! The band represents the pressure range during which the paired device must
//! switch playback into simulation mode. Commands are emitted only on band
//! crossings — repeated readings inside the same band never re-emit, since
//! spurious repeated commands would desynchronize the device.

use crate::types::{PlaybackCommand, TriggerState};

/// Inclusive mmHg interval that gates simulation mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureBand {
    low_mmhg: f64,
    high_mmhg: f64,
}

impl PressureBand {
    /// Create a band; both edges are inside the band
    pub fn new(low_mmhg: f64, high_mmhg: f64) -> Self {
        Self {
            low_mmhg,
            high_mmhg,
        }
    }

    /// Check whether a pressure lies inside the band (inclusive)
    pub fn contains(&self, mmhg: f64) -> bool {
        mmhg >= self.low_mmhg && mmhg <= self.high_mmhg
    }
}

impl Default for PressureBand {
    fn default() -> Self {
        Self::new(55.0, 105.0)
    }
}

/// Two-state machine evaluated on every reading
pub struct ThresholdTrigger {
    band: PressureBand,
    state: TriggerState,
    transitions: u64,
}

impl ThresholdTrigger {
    /// Create a trigger in the Normal state
    pub fn new(band: PressureBand) -> Self {
        Self {
            band,
            state: TriggerState::Normal,
            transitions: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Number of state transitions so far
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Evaluate one reading; returns a command only on a band crossing.
    ///
    /// The state transition happens here regardless of whether the returned
    /// command is later delivered — delivery failure never rolls it back.
    pub fn update(&mut self, mmhg: f64) -> Option<PlaybackCommand> {
        match (self.state, self.band.contains(mmhg)) {
            (TriggerState::Normal, true) => {
                self.state = TriggerState::Simulation;
                self.transitions += 1;
                Some(PlaybackCommand::StartSimulation)
            }
            (TriggerState::Simulation, false) => {
                self.state = TriggerState::Normal;
                self.transitions += 1;
                Some(PlaybackCommand::StopSimulation)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(trigger: &mut ThresholdTrigger, values: &[f64]) -> Vec<PlaybackCommand> {
        values.iter().filter_map(|&v| trigger.update(v)).collect()
    }

    #[test]
    fn test_rise_and_fall_emit_one_command_each() {
        let mut trigger = ThresholdTrigger::new(PressureBand::default());
        let commands = feed(&mut trigger, &[40.0, 60.0, 80.0, 60.0, 40.0]);

        assert_eq!(
            commands,
            vec![
                PlaybackCommand::StartSimulation,
                PlaybackCommand::StopSimulation
            ]
        );
        assert_eq!(trigger.state(), TriggerState::Normal);
        assert_eq!(trigger.transitions(), 2);
    }

    #[test]
    fn test_staying_in_band_emits_once() {
        let mut trigger = ThresholdTrigger::new(PressureBand::default());
        let commands = feed(&mut trigger, &[60.0, 70.0, 80.0]);

        assert_eq!(commands, vec![PlaybackCommand::StartSimulation]);
        assert_eq!(trigger.state(), TriggerState::Simulation);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let mut trigger = ThresholdTrigger::new(PressureBand::default());
        assert_eq!(
            trigger.update(55.0),
            Some(PlaybackCommand::StartSimulation)
        );

        let mut trigger = ThresholdTrigger::new(PressureBand::default());
        assert_eq!(
            trigger.update(105.0),
            Some(PlaybackCommand::StartSimulation)
        );
    }

    #[test]
    fn test_just_outside_band_does_not_trigger() {
        let mut trigger = ThresholdTrigger::new(PressureBand::default());
        assert_eq!(trigger.update(54.99), None);
        assert_eq!(trigger.update(105.01), None);
        assert_eq!(trigger.state(), TriggerState::Normal);
    }

    #[test]
    fn test_exit_above_band() {
        let mut trigger = ThresholdTrigger::new(PressureBand::default());
        trigger.update(80.0);
        assert_eq!(
            trigger.update(140.0),
            Some(PlaybackCommand::StopSimulation)
        );
    }

    #[test]
    fn test_staying_outside_band_is_silent() {
        let mut trigger = ThresholdTrigger::new(PressureBand::default());
        assert!(feed(&mut trigger, &[10.0, 20.0, 150.0, 30.0]).is_empty());
        assert_eq!(trigger.transitions(), 0);
    }
}
