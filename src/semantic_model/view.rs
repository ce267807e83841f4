use super::{is_valid_member_name, CubeModel};
use serde::{Serialize, Serializer};

/// Members a view pulls in from one cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Includes {
    All,
    Members(Vec<String>),
}

impl Serialize for Includes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Includes::All => serializer.serialize_str("*"),
            Includes::Members(members) => members.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewCube {
    pub join_path: String,
    pub includes: Includes,
    pub prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub name: String,
    pub description: String,
    pub cubes: Vec<ViewCube>,
}

impl ViewModel {
    /// Checks the name and that every join path walks existing joins.
    pub fn validate(&self, cubes: &[CubeModel]) -> Vec<String> {
        let mut problems = Vec::new();

        if !is_valid_member_name(&self.name) {
            problems.push(format!(
                "view name '{}' should start with a lowercase letter and contain only [a-z0-9_]",
                self.name
            ));
        }
        if self.cubes.is_empty() {
            problems.push(format!("view '{}' includes no cubes", self.name));
        }

        for view_cube in &self.cubes {
            let mut hops = view_cube.join_path.split('.');
            let Some(root) = hops.next() else {
                continue;
            };
            let Some(mut current) = cubes.iter().find(|c| c.name == root) else {
                problems.push(format!(
                    "view '{}' references unknown cube '{}'",
                    self.name, root
                ));
                continue;
            };
            for hop in hops {
                let joined = current.joins.iter().any(|j| j.target_cube == hop);
                match cubes.iter().find(|c| c.name == hop).filter(|_| joined) {
                    Some(cube) => current = cube,
                    None => {
                        problems.push(format!(
                            "view '{}' join path '{}': cube '{}' has no join to '{}'",
                            self.name, view_cube.join_path, current.name, hop
                        ));
                        break;
                    }
                }
            }
        }

        problems
    }
}
