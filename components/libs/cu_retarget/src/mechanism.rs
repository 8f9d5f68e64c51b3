//! Target mechanism: a named node tree carrying revolute actuators.
//!
//! The tree is only searched once, at setup, to bind every calibrated
//! joint to its actuator.  The bound actuators then live in an
//! [`ActuatorTable`] indexed by [`JointPosition`].

use crate::calibration::CalibrationTable;
use crate::error::RetargetResult;
use crate::joint::{Axis, JOINT_COUNT, JointPosition};
use glam::Vec3;
use log::{debug, warn};
use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single-axis drive of the mechanism.
pub trait Actuator {
    /// Mechanical limits in degrees, in whatever order they were set.
    fn limits(&self) -> (f32, f32);

    /// Euler angles (degrees, XYZ) of the joint's mounting orientation.
    fn anchor_euler(&self) -> Vec3;

    /// Command a target angle in degrees.
    fn set_target(&mut self, degrees: f32);

    /// Last commanded target in degrees.
    fn target(&self) -> f32;
}

/// In-memory revolute drive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RevoluteDrive {
    pub lower: f32,
    pub upper: f32,
    #[serde(default)]
    pub anchor_euler: Vec3,
    #[serde(default)]
    pub target: f32,
}

impl RevoluteDrive {
    pub fn new(lower: f32, upper: f32) -> Self {
        Self {
            lower,
            upper,
            ..Self::default()
        }
    }

    /// A drive mounted so that it turns about `axis`.
    pub fn about(axis: Axis, lower: f32, upper: f32) -> Self {
        let anchor_euler = match axis {
            Axis::X => Vec3::ZERO,
            Axis::Y => Vec3::new(0.0, 0.0, 90.0),
            Axis::Z => Vec3::new(0.0, 90.0, 0.0),
        };
        Self {
            anchor_euler,
            ..Self::new(lower, upper)
        }
    }
}

impl Actuator for RevoluteDrive {
    fn limits(&self) -> (f32, f32) {
        (self.lower, self.upper)
    }

    fn anchor_euler(&self) -> Vec3 {
        self.anchor_euler
    }

    fn set_target(&mut self, degrees: f32) {
        self.target = degrees;
    }

    fn target(&self) -> f32 {
        self.target
    }
}

/// One node of the mechanism tree.
pub struct MechanismNode {
    pub name: String,
    actuator: Option<Box<dyn Actuator>>,
}

impl MechanismNode {
    pub fn has_actuator(&self) -> bool {
        self.actuator.is_some()
    }
}

/// Serializable description of a mechanism tree.
///
/// ```json
/// {"name": "roid1", "children": [
///     {"name": "c_waist", "drive": {"lower": -90.0, "upper": 90.0}, "children": []}
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    #[serde(default)]
    pub drive: Option<RevoluteDrive>,
    #[serde(default)]
    pub children: Vec<NodeDescription>,
}

/// Named node tree of the target mechanism.
pub struct Mechanism {
    graph: Graph<MechanismNode, ()>,
    root: NodeIndex,
}

impl Mechanism {
    pub fn new(root_name: &str) -> Self {
        let mut graph = Graph::new();
        let root = graph.add_node(MechanismNode {
            name: root_name.to_string(),
            actuator: None,
        });
        Self { graph, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Attach a child node under `parent`.
    pub fn add_node(
        &mut self,
        parent: NodeIndex,
        name: &str,
        actuator: Option<Box<dyn Actuator>>,
    ) -> NodeIndex {
        let node = self.graph.add_node(MechanismNode {
            name: name.to_string(),
            actuator,
        });
        self.graph.add_edge(parent, node, ());
        node
    }

    pub fn node(&self, index: NodeIndex) -> &MechanismNode {
        &self.graph[index]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Depth-first search below the root for a node called `name`.
    ///
    /// Children are visited in insertion order; the root itself is not a
    /// candidate.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.find_below(self.root, name)
    }

    fn find_below(&self, node: NodeIndex, name: &str) -> Option<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        // petgraph lists the most recently added edge first
        children.reverse();
        for child in children {
            if self.graph[child].name == name {
                return Some(child);
            }
            if let Some(found) = self.find_below(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Move the actuator out of a node.
    pub fn take_actuator(&mut self, index: NodeIndex) -> Option<Box<dyn Actuator>> {
        self.graph[index].actuator.take()
    }

    pub fn from_description(desc: &NodeDescription) -> Self {
        let mut mechanism = Self::new(&desc.name);
        let root = mechanism.root;
        mechanism.add_children(root, &desc.children);
        mechanism
    }

    fn add_children(&mut self, parent: NodeIndex, children: &[NodeDescription]) {
        for child in children {
            let actuator = child
                .drive
                .map(|drive| Box::new(drive) as Box<dyn Actuator>);
            let node = self.add_node(parent, &child.name, actuator);
            self.add_children(node, &child.children);
        }
    }

    pub fn load(path: &Path) -> RetargetResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let desc: NodeDescription = serde_json::from_str(&contents)?;
        Ok(Self::from_description(&desc))
    }
}

/// Actuators bound to joints.  Absent entries are inert joints.
pub struct ActuatorTable {
    slots: [Option<Box<dyn Actuator>>; JOINT_COUNT],
}

impl Default for ActuatorTable {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl ActuatorTable {
    /// Table with no actuators: every joint is computed but inert.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind every calibrated joint to the actuator of its named node.
    ///
    /// Joints whose node is missing, or carries no actuator, stay inert.
    pub fn resolve(mechanism: &mut Mechanism, calibration: &CalibrationTable) -> Self {
        let mut table = Self::default();
        for (joint, spec) in calibration.iter() {
            let actuator = mechanism
                .find(&spec.name)
                .and_then(|node| mechanism.take_actuator(node));
            match actuator {
                Some(actuator) => {
                    debug!("bound {} to node '{}'", joint, spec.name);
                    table.slots[joint.index()] = Some(actuator);
                }
                None => warn!("no actuator '{}' for {}, joint is inert", spec.name, joint),
            }
        }
        table
    }

    pub fn insert(&mut self, joint: JointPosition, actuator: Box<dyn Actuator>) {
        self.slots[joint.index()] = Some(actuator);
    }

    pub fn remove(&mut self, joint: JointPosition) -> Option<Box<dyn Actuator>> {
        self.slots[joint.index()].take()
    }

    pub fn get(&self, joint: JointPosition) -> Option<&(dyn Actuator + 'static)> {
        self.slots[joint.index()].as_deref()
    }

    pub fn get_mut(&mut self, joint: JointPosition) -> Option<&mut (dyn Actuator + 'static)> {
        self.slots[joint.index()].as_deref_mut()
    }

    /// Number of bound joints.
    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Description of the Roid1 humanoid with every calibrated joint present.
///
/// Limits are generous hobby-servo ranges.  The left shoulder roll has
/// its limits stored upper-first, as some exporters write them.
pub fn roid1_description() -> NodeDescription {
    fn leaf(name: &str, drive: RevoluteDrive, children: Vec<NodeDescription>) -> NodeDescription {
        NodeDescription {
            name: name.to_string(),
            drive: Some(drive),
            children,
        }
    }

    fn arm(prefix: &str, roll: RevoluteDrive) -> NodeDescription {
        let n = |s: &str| format!("{prefix}_{s}");
        leaf(
            &n("shoulder"),
            RevoluteDrive::about(Axis::X, -180.0, 180.0),
            vec![leaf(
                &n("upperarm"),
                roll,
                vec![leaf(
                    &n("elbow"),
                    RevoluteDrive::about(Axis::X, -135.0, 135.0),
                    vec![leaf(&n("lowerarm"), RevoluteDrive::about(Axis::Y, -135.0, 135.0), vec![])],
                )],
            )],
        )
    }

    fn leg(prefix: &str) -> NodeDescription {
        let n = |s: &str| format!("{prefix}_{s}");
        leaf(
            &n("hipjointupper"),
            RevoluteDrive::about(Axis::Y, -90.0, 90.0),
            vec![leaf(
                &n("hipjointlower"),
                RevoluteDrive::about(Axis::Z, -90.0, 90.0),
                vec![leaf(
                    &n("upperleg"),
                    RevoluteDrive::about(Axis::X, -120.0, 120.0),
                    vec![leaf(
                        &n("lowerleg"),
                        RevoluteDrive::about(Axis::X, -135.0, 135.0),
                        vec![leaf(
                            &n("ankle"),
                            RevoluteDrive::about(Axis::X, -90.0, 90.0),
                            vec![leaf(&n("foot"), RevoluteDrive::about(Axis::Z, -60.0, 60.0), vec![])],
                        )],
                    )],
                )],
            )],
        )
    }

    NodeDescription {
        name: "roid1".to_string(),
        drive: None,
        children: vec![leaf(
            "c_waist",
            RevoluteDrive::about(Axis::Y, -90.0, 90.0),
            vec![
                leaf(
                    "c_chest",
                    RevoluteDrive::about(Axis::Y, -90.0, 90.0),
                    vec![
                        leaf("c_head", RevoluteDrive::about(Axis::Y, -90.0, 90.0), vec![]),
                        arm("r", RevoluteDrive::about(Axis::Z, -180.0, 180.0)),
                        arm("l", RevoluteDrive::about(Axis::Z, 180.0, -180.0)),
                    ],
                ),
                leg("r"),
                leg("l"),
            ],
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_nodes() {
        let mut m = Mechanism::new("robot");
        let a = m.add_node(m.root(), "a", None);
        let b = m.add_node(a, "b", Some(Box::new(RevoluteDrive::new(-10.0, 10.0))));
        m.add_node(m.root(), "c", None);
        assert_eq!(m.find("b"), Some(b));
        assert_eq!(m.find("a"), Some(a));
        assert_eq!(m.find("robot"), None);
        assert_eq!(m.find("zzz"), None);
        assert!(m.node(b).has_actuator());
        assert!(m.take_actuator(b).is_some());
        assert!(!m.node(b).has_actuator());
    }

    #[test]
    fn resolve_binds_every_roid1_joint() {
        let mut m = Mechanism::from_description(&roid1_description());
        let table = ActuatorTable::resolve(&mut m, &CalibrationTable::roid1());
        assert_eq!(table.bound_count(), JOINT_COUNT);
        let foot = table.get(JointPosition::RightFootRoll).unwrap();
        assert_eq!(Axis::from_anchor_euler(foot.anchor_euler()), Axis::Z);
    }

    #[test]
    fn missing_node_leaves_joint_inert() {
        let mut desc = roid1_description();
        desc.children[0].children.pop(); // left leg
        let mut m = Mechanism::from_description(&desc);
        let table = ActuatorTable::resolve(&mut m, &CalibrationTable::roid1());
        assert!(table.get(JointPosition::LeftFootRoll).is_none());
        assert!(table.get(JointPosition::RightFootRoll).is_some());
        assert_eq!(table.bound_count(), JOINT_COUNT - 6);
    }

    #[test]
    fn description_round_trips_through_json() {
        let desc = roid1_description();
        let json = serde_json::to_string(&desc).unwrap();
        let back: NodeDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mechanism.json");
        std::fs::write(
            &path,
            r#"{"name": "bot", "children": [{"name": "c_head", "drive": {"lower": 30.0, "upper": -30.0}}]}"#,
        )
        .unwrap();
        let m = Mechanism::load(&path).unwrap();
        assert_eq!(m.node_count(), 2);
        let head = m.find("c_head").unwrap();
        assert!(m.node(head).has_actuator());
    }
}
