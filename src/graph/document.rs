//! ProvenanceGraph: the aggregate root assembled for one run

use super::entity::{Collection, CollectionKind, Entity, EntityBody, EntityId, PropertyValue};
use super::relation::Relation;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the root data entity
pub const ROOT_ID: &str = "./";

/// Identifier of the metadata descriptor written into JSON-LD output
pub const METADATA_ID: &str = "ro-crate-metadata.json";

/// Errors raised by graph mutations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Entity {id} is a {found}, expected {expected}")]
    KindMismatch {
        id: EntityId,
        expected: &'static str,
        found: &'static str,
    },
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// When the graph was created
    pub created_at: Option<DateTime<Utc>>,
    /// When the graph was last modified
    pub updated_at: Option<DateTime<Utc>>,
}

/// In-memory provenance document.
///
/// Entities are kept in insertion order so serialized output is stable
/// across runs over the same pipeline state. The root data entity `./` is
/// created with the graph and owns the `hasPart` membership list.
#[derive(Debug, Clone)]
pub struct ProvenanceGraph {
    /// Human-readable name (used for the root data entity)
    pub name: String,
    entities: IndexMap<EntityId, Entity>,
    /// Graph metadata
    pub metadata: GraphMetadata,
}

impl ProvenanceGraph {
    /// Create an empty graph holding only its root data entity
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut graph = Self {
            name: name.clone(),
            entities: IndexMap::new(),
            metadata: GraphMetadata {
                created_at: Some(Utc::now()),
                ..Default::default()
            },
        };
        let root = Entity::new(
            ROOT_ID,
            EntityBody::Collection(Collection {
                kind: CollectionKind::Dataset,
                name,
                description: None,
                date_published: None,
                version: None,
            }),
        );
        graph.entities.insert(root.id.clone(), root);
        graph
    }

    /// Rebuild a graph from stored entities.
    ///
    /// A root data entity is synthesised if the stored set lacks one.
    pub fn from_entities(
        name: impl Into<String>,
        metadata: GraphMetadata,
        entities: impl IntoIterator<Item = Entity>,
    ) -> Self {
        let mut graph = Self::new(name);
        graph.metadata = metadata;
        for entity in entities {
            graph.entities.insert(entity.id.clone(), entity);
        }
        graph
    }

    /// Return the existing entity id, or insert `body` under `id`.
    ///
    /// On a hit the stored entity is left untouched and `body` is dropped.
    pub fn get_or_create(&mut self, id: impl Into<EntityId>, body: EntityBody) -> EntityId {
        let id = id.into();
        if !self.entities.contains_key(&id) {
            self.entities.insert(id.clone(), Entity::new(id.clone(), body));
            self.touch();
        }
        id
    }

    /// `get_or_create` followed by appending the entity to the root `hasPart` list
    pub fn add_data_entity(&mut self, id: impl Into<EntityId>, body: EntityBody) -> EntityId {
        let id = self.get_or_create(id, body);
        if let Some(root) = self.entities.get_mut(ROOT_ID) {
            root.relations.push_unique(Relation::HasPart, id.clone());
        }
        id
    }

    /// Append `value` to `target`'s `relation` list unless already present.
    ///
    /// Identity is by identifier. Returns true when the list grew.
    pub fn append_unique(
        &mut self,
        target: &EntityId,
        relation: Relation,
        value: &EntityId,
    ) -> GraphResult<bool> {
        let entity = self
            .entities
            .get_mut(target)
            .ok_or_else(|| GraphError::EntityNotFound(target.clone()))?;
        let appended = entity.relations.push_unique(relation, value.clone());
        if appended {
            self.touch();
        }
        Ok(appended)
    }

    /// Replace a single-valued relation
    pub fn set_relation(
        &mut self,
        target: &EntityId,
        relation: Relation,
        value: &EntityId,
    ) -> GraphResult<()> {
        let entity = self
            .entities
            .get_mut(target)
            .ok_or_else(|| GraphError::EntityNotFound(target.clone()))?;
        entity.relations.set(relation, value.clone());
        self.touch();
        Ok(())
    }

    /// Append `value` to the root `hasPart` list
    pub fn add_part(&mut self, value: &EntityId) -> GraphResult<bool> {
        self.append_unique(&EntityId::from(ROOT_ID), Relation::HasPart, value)
    }

    /// Point the root data entity at its main entity
    pub fn set_main_entity(&mut self, id: &EntityId) -> GraphResult<()> {
        if !self.entities.contains_key(id) {
            return Err(GraphError::EntityNotFound(id.clone()));
        }
        self.set_relation(&EntityId::from(ROOT_ID), Relation::MainEntity, id)
    }

    pub fn main_entity(&self) -> Option<&EntityId> {
        self.root().relations.targets(Relation::MainEntity).first()
    }

    /// Set a pass-through property on an existing entity
    pub fn set_property(
        &mut self,
        target: &EntityId,
        key: impl Into<String>,
        value: PropertyValue,
    ) -> GraphResult<()> {
        let entity = self
            .entities
            .get_mut(target)
            .ok_or_else(|| GraphError::EntityNotFound(target.clone()))?;
        entity.extra.insert(key.into(), value);
        self.touch();
        Ok(())
    }

    /// The root data entity
    pub fn root(&self) -> &Entity {
        // The root is inserted by every constructor and never removed.
        &self.entities[ROOT_ID]
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Targets of `relation` on `id`, empty if either is missing
    pub fn targets(&self, id: &EntityId, relation: Relation) -> &[EntityId] {
        self.entities
            .get(id)
            .map(|e| e.relations.targets(relation))
            .unwrap_or(&[])
    }

    /// All entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of entities, root included
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entities whose body matches `pred`
    pub fn find<'a, P>(&'a self, pred: P) -> impl Iterator<Item = &'a Entity>
    where
        P: Fn(&EntityBody) -> bool + 'a,
    {
        self.entities.values().filter(move |e| pred(&e.body))
    }

    fn touch(&mut self) {
        self.metadata.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CreateAction, FormalParameter};

    fn param(name: &str) -> EntityBody {
        EntityBody::FormalParameter(FormalParameter {
            name: name.to_string(),
            base_key: name.to_string(),
            version: Some(1),
            additional_type: "File".to_string(),
            value_required: true,
        })
    }

    #[test]
    fn new_graph_has_root_only() {
        let graph = ProvenanceGraph::new("test");
        assert_eq!(graph.entity_count(), 1);
        assert_eq!(graph.root().id.as_str(), ROOT_ID);
        assert!(graph.main_entity().is_none());
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut graph = ProvenanceGraph::new("test");
        let first = graph.get_or_create("#fp-transects-1", param("first"));
        let count = graph.entity_count();

        let second = graph.get_or_create("#fp-transects-1", param("second"));
        assert_eq!(first, second);
        assert_eq!(graph.entity_count(), count);
        assert_eq!(graph.get(&first).unwrap().body.name(), "first");
    }

    #[test]
    fn append_unique_skips_duplicates() {
        let mut graph = ProvenanceGraph::new("test");
        let action = graph.get_or_create(
            "#create-action-1",
            EntityBody::CreateAction(CreateAction { name: "run".into() }),
        );
        let p = graph.get_or_create("#fp-x-1", param("x"));

        assert!(graph.append_unique(&action, Relation::Input, &p).unwrap());
        assert!(!graph.append_unique(&action, Relation::Input, &p).unwrap());
        assert_eq!(graph.targets(&action, Relation::Input).len(), 1);
    }

    #[test]
    fn append_to_missing_entity_fails() {
        let mut graph = ProvenanceGraph::new("test");
        let result = graph.append_unique(
            &EntityId::from("missing"),
            Relation::Output,
            &EntityId::from("#fp-x-1"),
        );
        assert!(matches!(result, Err(GraphError::EntityNotFound(_))));
    }

    #[test]
    fn add_data_entity_registers_membership_once() {
        let mut graph = ProvenanceGraph::new("test");
        graph.add_data_entity("a.csv", param("a"));
        graph.add_data_entity("a.csv", param("a"));
        assert_eq!(graph.root().relations.targets(Relation::HasPart).len(), 1);
    }

    #[test]
    fn main_entity_must_exist() {
        let mut graph = ProvenanceGraph::new("test");
        assert!(graph.set_main_entity(&EntityId::from("nope")).is_err());

        let id = graph.get_or_create("wf", param("wf"));
        graph.set_main_entity(&id).unwrap();
        assert_eq!(graph.main_entity(), Some(&id));
    }
}
