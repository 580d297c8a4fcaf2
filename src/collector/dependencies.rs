use super::{CollectError, Collector, Enumerated};
use crate::catalog::{InstanceId, ResourceType};
use crate::graph::referenced_targets;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

impl Collector<'_> {
    /// Pull in instances that collected instances reference but that were not
    /// requested, until a pass adds nothing. Returns the types that entered
    /// the corpus only this way.
    ///
    /// Enumerators already called are not called again; their results are
    /// reused from `enumerated`.
    pub(super) async fn resolve_dependencies(
        &self,
        enumerated: &mut Enumerated,
        selected: &mut Enumerated,
        permission_failures: &mut BTreeMap<ResourceType, String>,
    ) -> Result<BTreeSet<ResourceType>, CollectError> {
        let registered: BTreeSet<ResourceType> = self.registry.resource_types().into_iter().collect();
        let requested: BTreeSet<ResourceType> = selected.keys().cloned().collect();
        let mut pulled_types = BTreeSet::new();

        for pass in 1.. {
            let mut missing: BTreeMap<ResourceType, BTreeSet<InstanceId>> = BTreeMap::new();
            for (resource_type, instances) in selected.iter() {
                let Some(spec) = self.catalog.spec(resource_type) else {
                    continue;
                };
                for instance in instances {
                    for (target_type, target_id) in referenced_targets(&instance.attributes, spec) {
                        let wanted = registered.contains(&target_type)
                            && self.options.selection.allows_type(&target_type)
                            && !permission_failures.contains_key(&target_type)
                            && !selected
                                .get(&target_type)
                                .is_some_and(|have| have.iter().any(|i| i.id == target_id));
                        if wanted {
                            missing.entry(target_type).or_default().insert(target_id);
                        }
                    }
                }
            }

            let fresh_types: Vec<ResourceType> = missing
                .keys()
                .filter(|t| !enumerated.contains_key(*t))
                .cloned()
                .collect();
            if !fresh_types.is_empty() {
                debug!("Dependency pass {} enumerates {} new type(s)", pass, fresh_types.len());
                let fresh = self.enumerate_all(fresh_types, permission_failures).await?;
                enumerated.extend(fresh);
            }

            let mut added = 0usize;
            for (target_type, ids) in missing {
                let Some(pool) = enumerated.get(&target_type) else {
                    continue;
                };
                let matches: Vec<_> = pool
                    .iter()
                    .filter(|i| ids.contains(&i.id))
                    .filter(|i| self.options.selection.allows_instance(&target_type, i))
                    .cloned()
                    .collect();
                if matches.is_empty() {
                    continue;
                }
                added += matches.len();
                if !requested.contains(&target_type) {
                    pulled_types.insert(target_type.clone());
                }
                selected.entry(target_type).or_default().extend(matches);
            }

            info!("Dependency pass {} added {} instance(s)", pass, added);
            if added == 0 {
                break;
            }
        }
        Ok(pulled_types)
    }
}
