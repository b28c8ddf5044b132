//! Named relations between entities

use super::entity::EntityId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Relationship kinds used by the provenance graph.
///
/// Serialized names are the JSON-LD property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Relation {
    /// Membership of a data entity in a collection
    HasPart,
    /// Root entity pointer on the root data entity
    MainEntity,
    /// Ordered steps of a workflow
    Step,
    /// Formal parameters consumed
    Input,
    /// Formal parameters produced
    Output,
    /// Concrete file or nested graph standing for an abstract work
    ExampleOfWork,
    /// Code artifact realising a step
    WorkExample,
    /// Code artifact used by a create action
    Instrument,
    /// Artifact produced by a create action
    Result,
    /// Create action describing a step's execution
    About,
    /// Kernel that executes a step
    Tool,
    /// Language a workflow or step is written in
    ProgrammingLanguage,
    /// Software application a notebook targets
    TargetProduct,
}

impl Relation {
    /// JSON-LD property name
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::HasPart => "hasPart",
            Relation::MainEntity => "mainEntity",
            Relation::Step => "step",
            Relation::Input => "input",
            Relation::Output => "output",
            Relation::ExampleOfWork => "exampleOfWork",
            Relation::WorkExample => "workExample",
            Relation::Instrument => "instrument",
            Relation::Result => "result",
            Relation::About => "about",
            Relation::Tool => "tool",
            Relation::ProgrammingLanguage => "programmingLanguage",
            Relation::TargetProduct => "targetProduct",
        }
    }

    /// Relations rendered as a single `{"@id": ..}` reference when they hold one target.
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            Relation::MainEntity
                | Relation::WorkExample
                | Relation::Instrument
                | Relation::Result
                | Relation::About
                | Relation::Tool
                | Relation::ProgrammingLanguage
                | Relation::TargetProduct
        )
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, duplicate-free list of relation targets.
///
/// Membership is tracked by identifier in a set so appends stay O(1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EntityId>", into = "Vec<EntityId>")]
pub struct RelationList {
    items: Vec<EntityId>,
    index: HashSet<EntityId>,
}

impl RelationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already present. Returns true when appended.
    pub fn push_unique(&mut self, id: EntityId) -> bool {
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.items.push(id);
        true
    }

    /// Replace the whole list with a single target.
    pub fn replace(&mut self, id: EntityId) {
        self.items.clear();
        self.index.clear();
        self.push_unique(id);
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<EntityId>> for RelationList {
    fn from(ids: Vec<EntityId>) -> Self {
        let mut list = Self::new();
        for id in ids {
            list.push_unique(id);
        }
        list
    }
}

impl From<RelationList> for Vec<EntityId> {
    fn from(list: RelationList) -> Self {
        list.items
    }
}

/// Serialized form of one relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEntry {
    pub relation: Relation,
    pub targets: Vec<EntityId>,
}

/// All outgoing relations of one entity, in first-use order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RelationEntry>", into = "Vec<RelationEntry>")]
pub struct Relations(IndexMap<Relation, RelationList>);

impl Relations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relation: Relation) -> Option<&RelationList> {
        self.0.get(&relation)
    }

    /// Targets of `relation`, empty when the relation was never set.
    pub fn targets(&self, relation: Relation) -> &[EntityId] {
        self.0.get(&relation).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub fn push_unique(&mut self, relation: Relation, id: EntityId) -> bool {
        self.0.entry(relation).or_default().push_unique(id)
    }

    pub fn set(&mut self, relation: Relation, id: EntityId) {
        self.0.entry(relation).or_default().replace(id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Relation, &RelationList)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|l| l.is_empty())
    }
}

impl From<Vec<RelationEntry>> for Relations {
    fn from(entries: Vec<RelationEntry>) -> Self {
        let mut relations = Self::new();
        for entry in entries {
            for target in entry.targets {
                relations.push_unique(entry.relation, target);
            }
        }
        relations
    }
}

impl From<Relations> for Vec<RelationEntry> {
    fn from(relations: Relations) -> Self {
        relations
            .0
            .into_iter()
            .map(|(relation, list)| RelationEntry {
                relation,
                targets: list.into(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_unique_ignores_repeated_ids() {
        let mut list = RelationList::new();
        assert!(list.push_unique(EntityId::from("#fp-a-1")));
        assert!(!list.push_unique(EntityId::from("#fp-a-1")));
        assert!(list.push_unique(EntityId::from("#fp-b-1")));
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[1].as_str(), "#fp-b-1");
    }

    #[test]
    fn replace_keeps_only_new_target() {
        let mut relations = Relations::new();
        relations.push_unique(Relation::Result, EntityId::from("a.json"));
        relations.set(Relation::Result, EntityId::from("b.json"));
        assert_eq!(relations.targets(Relation::Result), &[EntityId::from("b.json")]);
    }

    #[test]
    fn missing_relation_has_no_targets() {
        let relations = Relations::new();
        assert!(relations.targets(Relation::Input).is_empty());
        assert!(relations.is_empty());
    }

    #[test]
    fn relation_list_deduplicates_on_conversion() {
        let list = RelationList::from(vec![
            EntityId::from("x"),
            EntityId::from("y"),
            EntityId::from("x"),
        ]);
        assert_eq!(list.len(), 2);
    }
}
