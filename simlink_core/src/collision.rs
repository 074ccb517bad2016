// simlink_core/src/collision.rs

use crate::engine::{Contact, SimulationEngine};
use serde::{Deserialize, Serialize};

fn default_targets() -> Vec<String> {
    vec!["Tank".to_string()]
}

/// Which contacts count as a collision for a robot.
///
/// A contact matches when one body's name contains the robot name and the
/// other, differently named body contains one of `targets`. An empty
/// target list matches any other body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionRule {
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
}

impl Default for CollisionRule {
    fn default() -> Self {
        Self {
            targets: default_targets(),
        }
    }
}

impl CollisionRule {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    fn is_target(&self, body: &str) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| body.contains(t.as_str()))
    }

    /// Both orderings of the pair are checked. A body never collides with
    /// itself.
    pub fn matches(&self, robot: &str, contact: &Contact) -> bool {
        if contact.body_a == contact.body_b {
            return false;
        }
        (contact.body_a.contains(robot) && self.is_target(&contact.body_b))
            || (contact.body_b.contains(robot) && self.is_target(&contact.body_a))
    }

    pub fn colliding_pairs<'a>(
        &'a self,
        robot: &'a str,
        contacts: &'a [Contact],
    ) -> impl Iterator<Item = &'a Contact> + 'a {
        contacts.iter().filter(move |c| self.matches(robot, c))
    }

    /// `1.0` if the robot is touching a target this tick, `0.0` otherwise.
    pub fn flag(&self, engine: &dyn SimulationEngine, robot: &str) -> f64 {
        if self.colliding_pairs(robot, engine.contacts()).next().is_some() {
            1.0
        } else {
            0.0
        }
    }
}
