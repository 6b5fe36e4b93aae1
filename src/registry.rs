//! Entity registry
//!
//! The registry is the single table of per-entity-type behaviour used by the
//! backup engine: which fields form the natural key, how restore conflicts
//! are resolved, which fields are always redacted, which fields a record must
//! carry, and which other entity types it references.
//!
//! Policies live here rather than being passed by callers, so restores are
//! deterministic for a given snapshot.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{PropdeskError, PropdeskResult};
use crate::models::EntityType;

/// How a restore handles a record whose natural key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the existing record untouched and emit a warning
    SkipIfExists,
    /// Merge incoming fields into the existing record, keeping its id
    UpsertOnConflict,
    /// Append-only data: no uniqueness check at all
    AppendAlways,
}

impl ConflictPolicy {
    /// Whether records of this policy are checked for natural-key collisions
    pub fn checks_uniqueness(&self) -> bool {
        !matches!(self, ConflictPolicy::AppendAlways)
    }
}

/// A foreign reference from one entity type to another
///
/// The field holds the `id` of a record of the target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target: EntityType,
}

/// Everything the backup engine needs to know about one entity type
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub entity_type: EntityType,
    /// Fields forming the natural key; empty for append-only types
    pub natural_key: &'static [&'static str],
    pub conflict_policy: ConflictPolicy,
    /// Field names always removed from snapshots (case-insensitive)
    pub denylist: &'static [&'static str],
    /// Fields that must be present and non-empty for a record to be stored
    pub required: &'static [&'static str],
    pub references: &'static [Reference],
}

const STANDARD: &[EntityDescriptor] = &[
    EntityDescriptor {
        entity_type: EntityType::Users,
        natural_key: &["email"],
        conflict_policy: ConflictPolicy::SkipIfExists,
        denylist: &[
            "password",
            "passwordHash",
            "resetToken",
            "resetTokenExpiry",
            "twoFactorSecret",
            "refreshToken",
            "apiKey",
        ],
        required: &["email", "name"],
        references: &[],
    },
    EntityDescriptor {
        entity_type: EntityType::Properties,
        natural_key: &["referenceCode"],
        conflict_policy: ConflictPolicy::UpsertOnConflict,
        denylist: &[],
        required: &["referenceCode", "title"],
        references: &[Reference {
            field: "agentId",
            target: EntityType::Users,
        }],
    },
    EntityDescriptor {
        entity_type: EntityType::Customers,
        natural_key: &["email"],
        conflict_policy: ConflictPolicy::UpsertOnConflict,
        denylist: &["portalPassword", "identityDocument"],
        required: &["email", "name"],
        references: &[Reference {
            field: "assignedAgentId",
            target: EntityType::Users,
        }],
    },
    EntityDescriptor {
        entity_type: EntityType::Leads,
        natural_key: &["id"],
        conflict_policy: ConflictPolicy::UpsertOnConflict,
        denylist: &[],
        required: &["id", "customerId"],
        references: &[
            Reference {
                field: "customerId",
                target: EntityType::Customers,
            },
            Reference {
                field: "propertyId",
                target: EntityType::Properties,
            },
        ],
    },
    EntityDescriptor {
        entity_type: EntityType::Appointments,
        natural_key: &["id"],
        conflict_policy: ConflictPolicy::UpsertOnConflict,
        denylist: &["calendarSyncToken"],
        required: &["id", "scheduledAt"],
        references: &[
            Reference {
                field: "leadId",
                target: EntityType::Leads,
            },
            Reference {
                field: "propertyId",
                target: EntityType::Properties,
            },
            Reference {
                field: "agentId",
                target: EntityType::Users,
            },
        ],
    },
    EntityDescriptor {
        entity_type: EntityType::NewsletterSubscribers,
        natural_key: &["email"],
        conflict_policy: ConflictPolicy::SkipIfExists,
        denylist: &["unsubscribeToken", "confirmationToken"],
        required: &["email"],
        references: &[],
    },
    EntityDescriptor {
        entity_type: EntityType::ActivityLog,
        natural_key: &[],
        conflict_policy: ConflictPolicy::AppendAlways,
        denylist: &[],
        required: &["action"],
        references: &[Reference {
            field: "userId",
            target: EntityType::Users,
        }],
    },
    EntityDescriptor {
        entity_type: EntityType::SiteSettings,
        natural_key: &["name"],
        conflict_policy: ConflictPolicy::UpsertOnConflict,
        denylist: &["smtpPassword", "googleClientSecret", "calendarApiKey"],
        required: &["name"],
        references: &[],
    },
];

/// Ordered table of entity descriptors
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    descriptors: Vec<EntityDescriptor>,
}

impl EntityRegistry {
    /// Build a registry, rejecting duplicate types, references to
    /// unregistered types and reference cycles
    pub fn new(descriptors: Vec<EntityDescriptor>) -> PropdeskResult<Self> {
        let mut seen = BTreeSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.entity_type) {
                return Err(PropdeskError::Config(format!(
                    "entity type {} is registered twice",
                    descriptor.entity_type
                )));
            }
        }

        for descriptor in &descriptors {
            for reference in descriptor.references {
                if !seen.contains(&reference.target) {
                    return Err(PropdeskError::Config(format!(
                        "{}.{} references unregistered entity type {}",
                        descriptor.entity_type, reference.field, reference.target
                    )));
                }
            }
        }

        let registry = Self { descriptors };
        registry.import_order()?;
        Ok(registry)
    }

    /// The registry of the CRM's entity types
    pub fn standard() -> Self {
        Self {
            descriptors: STANDARD.to_vec(),
        }
    }

    /// All descriptors in registry order
    pub fn descriptors(&self) -> &[EntityDescriptor] {
        &self.descriptors
    }

    /// All registered entity types in registry order
    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.descriptors.iter().map(|d| d.entity_type)
    }

    /// Look up the descriptor for an entity type
    pub fn get(&self, entity_type: EntityType) -> Option<&EntityDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.entity_type == entity_type)
    }

    /// Whether an entity type is registered
    pub fn contains(&self, entity_type: EntityType) -> bool {
        self.get(entity_type).is_some()
    }

    /// Order in which entity types must be restored
    ///
    /// Referenced types come before the types referencing them. Among types
    /// with no ordering constraint between them, registry order is kept.
    pub fn import_order(&self) -> PropdeskResult<Vec<EntityType>> {
        let mut graph: DiGraph<EntityType, ()> = DiGraph::new();
        let mut nodes: HashMap<EntityType, NodeIndex> = HashMap::new();

        for descriptor in &self.descriptors {
            nodes.insert(descriptor.entity_type, graph.add_node(descriptor.entity_type));
        }

        // Edges point from the referenced (parent) type to the referencing type.
        for descriptor in &self.descriptors {
            let child = nodes[&descriptor.entity_type];
            for reference in descriptor.references {
                if let Some(&parent) = nodes.get(&reference.target) {
                    graph.update_edge(parent, child, ());
                }
            }
        }

        if petgraph::algo::is_cyclic_directed(&graph) {
            return Err(PropdeskError::Config(
                "entity references form a cycle; no import order exists".into(),
            ));
        }

        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        // Node indices follow registry order, so the smallest ready index wins.
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.descriptors.len());
        while let Some(next) = ready.pop_first() {
            let node = NodeIndex::new(next);
            order.push(graph[node]);

            for child in graph.neighbors_directed(node, Direction::Outgoing) {
                let degree = &mut in_degree[child.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(child.index());
                }
            }
        }

        Ok(order)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
