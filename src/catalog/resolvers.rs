use super::types::{CustomResolver, InstanceId, ResourceType};
use crate::attribute::AttrMap;
use tracing::debug;

/// Sibling attribute naming the kind of group a member group id refers to.
pub const MEMBER_GROUP_TYPE_ATTR: &str = "member_group_type";

/// Resolves `member_group_id`-style attributes, which point at a group, a
/// team or a skill group depending on the sibling `member_group_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberGroupResolver {
    pub group: ResourceType,
    pub team: ResourceType,
    pub skill_group: ResourceType,
}

impl Default for MemberGroupResolver {
    fn default() -> Self {
        Self {
            group: ResourceType::new("group"),
            team: ResourceType::new("team"),
            skill_group: ResourceType::new("routing_skill_group"),
        }
    }
}

impl CustomResolver for MemberGroupResolver {
    fn resolve(&self, value: &str, siblings: &AttrMap) -> Option<(ResourceType, InstanceId)> {
        let kind = siblings.get(MEMBER_GROUP_TYPE_ATTR)?.as_str()?;
        let target = match kind.to_ascii_uppercase().as_str() {
            "GROUP" => &self.group,
            "TEAM" => &self.team,
            "SKILLGROUP" => &self.skill_group,
            other => {
                debug!("Unknown member group type '{other}' for {value}");
                return None;
            }
        };
        Some((target.clone(), value.to_string()))
    }

    fn possible_targets(&self) -> Vec<ResourceType> {
        vec![
            self.group.clone(),
            self.team.clone(),
            self.skill_group.clone(),
        ]
    }
}

#[cfg(test)]
#[path = "resolvers_tests.rs"]
mod tests;
