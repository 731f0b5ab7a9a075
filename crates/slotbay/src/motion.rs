use crate::geometry::Point3;
use crate::tween::Tween;
use strum::Display as StrumDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Insert,
    Eject,
}

/// Motion-program cursor of one slot. `Idle` is both the initial state and
/// the resting state between gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum SlotPhase {
    #[default]
    Idle,
    Lifting,
    Traversing,
    Dropping,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStep {
    pub position: Point3,
    /// Set on the frame the drop phase arrives.
    pub completed: bool,
}

/// Lift, traverse, drop between two resting points.
///
/// The lift holds the start's lateral offset while moving to clearance depth,
/// the traverse holds clearance depth while moving to the end's lateral
/// offset, and the drop settles on the end point. Inserting and ejecting are
/// the same program with the endpoints swapped.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotMotion {
    direction: Direction,
    phase: SlotPhase,
    start: Point3,
    end: Point3,
    clearance_depth: f64,
    tween: Tween,
}

impl SlotMotion {
    pub fn new(
        direction: Direction,
        start: Point3,
        end: Point3,
        clearance_depth: f64,
        tween: Tween,
    ) -> Self {
        Self {
            direction,
            phase: SlotPhase::Lifting,
            start,
            end,
            clearance_depth,
            tween,
        }
    }

    pub fn insert(rest: Point3, active: Point3, clearance_depth: f64, tween: Tween) -> Self {
        Self::new(Direction::Insert, rest, active, clearance_depth, tween)
    }

    pub fn eject(rest: Point3, active: Point3, clearance_depth: f64, tween: Tween) -> Self {
        Self::new(Direction::Eject, active, rest, clearance_depth, tween)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    fn waypoint(&self) -> Point3 {
        match self.phase {
            SlotPhase::Lifting => self.start.with_depth(self.clearance_depth),
            SlotPhase::Traversing => self.end.with_depth(self.clearance_depth),
            SlotPhase::Dropping | SlotPhase::Idle => self.end,
        }
    }

    /// Advances one step of the current phase from `current`.
    ///
    /// A phase that arrives lands exactly on its waypoint and hands over to
    /// the next phase on the following frame.
    pub fn advance(&mut self, current: Point3) -> MotionStep {
        let target = self.waypoint();
        let step = self.tween.step(current, target);

        if !step.arrived {
            return MotionStep {
                position: step.value,
                completed: false,
            };
        }

        self.phase = match self.phase {
            SlotPhase::Lifting => SlotPhase::Traversing,
            SlotPhase::Traversing => SlotPhase::Dropping,
            SlotPhase::Dropping | SlotPhase::Idle => SlotPhase::Idle,
        };

        MotionStep {
            position: target,
            completed: self.phase == SlotPhase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REST: Point3 = Point3::new(-100.0, -80.0, 0.0);
    const ACTIVE: Point3 = Point3::new(0.0, 40.0, -10.0);
    const CLEARANCE: f64 = 60.0;

    fn run(motion: &mut SlotMotion, mut position: Point3) -> (Point3, Vec<SlotPhase>) {
        let mut phases = vec![motion.phase()];
        for _ in 0..10_000 {
            let step = motion.advance(position);
            position = step.position;
            if phases.last() != Some(&motion.phase()) {
                phases.push(motion.phase());
            }
            if step.completed {
                return (position, phases);
            }
        }
        panic!("motion never completed");
    }

    #[test]
    fn test_insert_runs_three_phases_in_order() {
        let mut motion = SlotMotion::insert(REST, ACTIVE, CLEARANCE, Tween::phase(0.1));
        let (end, phases) = run(&mut motion, REST);

        assert_eq!(end, ACTIVE);
        assert_eq!(
            phases,
            vec![
                SlotPhase::Lifting,
                SlotPhase::Traversing,
                SlotPhase::Dropping,
                SlotPhase::Idle
            ]
        );
    }

    #[test]
    fn test_eject_mirrors_insert() {
        let mut motion = SlotMotion::eject(REST, ACTIVE, CLEARANCE, Tween::phase(0.1));
        assert_eq!(motion.direction(), Direction::Eject);

        let (end, _) = run(&mut motion, ACTIVE);
        assert_eq!(end, REST);
    }

    #[test]
    fn test_lift_holds_lateral_offset() {
        let mut motion = SlotMotion::insert(REST, ACTIVE, CLEARANCE, Tween::phase(0.1));
        let mut position = REST;
        while motion.phase() == SlotPhase::Lifting {
            position = motion.advance(position).position;
            assert_eq!((position.x, position.y), (REST.x, REST.y));
        }
        assert_eq!(position.z, CLEARANCE);
    }

    #[test]
    fn test_traverse_holds_clearance_depth() {
        let mut motion = SlotMotion::insert(REST, ACTIVE, CLEARANCE, Tween::phase(0.1));
        let mut position = REST;
        while motion.phase() != SlotPhase::Dropping {
            position = motion.advance(position).position;
            if motion.phase() == SlotPhase::Traversing {
                assert_eq!(position.z, CLEARANCE);
            }
        }
        assert_eq!((position.x, position.y), (ACTIVE.x, ACTIVE.y));
    }

    #[test]
    fn test_one_step_per_advance() {
        let mut motion = SlotMotion::insert(REST, ACTIVE, CLEARANCE, Tween::phase(0.5));
        let step = motion.advance(REST);
        assert!(!step.completed);
        assert_eq!(step.position, Point3::new(REST.x, REST.y, 30.0));
        assert_eq!(motion.phase(), SlotPhase::Lifting);
    }
}
