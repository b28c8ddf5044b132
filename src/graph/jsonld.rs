//! JSON-LD rendering of a provenance graph

use super::document::{ProvenanceGraph, METADATA_ID, ROOT_ID};
use super::entity::{Entity, EntityBody};
use serde_json::{json, Map, Value};

const CONTEXT_URL: &str = "https://w3id.org/ro/crate/1.1/context";
const CONFORMS_TO: &str = "https://w3id.org/ro/crate/1.1";

impl ProvenanceGraph {
    /// Render the graph as a flattened JSON-LD document.
    ///
    /// The metadata descriptor comes first, followed by every entity in
    /// insertion order.
    pub fn to_jsonld(&self) -> Value {
        let mut graph = Vec::with_capacity(self.entity_count() + 1);
        graph.push(json!({
            "@id": METADATA_ID,
            "@type": "CreativeWork",
            "conformsTo": { "@id": CONFORMS_TO },
            "about": { "@id": ROOT_ID },
        }));
        graph.extend(self.entities().map(entity_to_jsonld));

        json!({
            "@context": CONTEXT_URL,
            "@graph": graph,
        })
    }
}

fn id_ref(id: &str) -> Value {
    json!({ "@id": id })
}

fn put_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.into());
    }
}

fn entity_to_jsonld(entity: &Entity) -> Value {
    let mut map = Map::new();
    map.insert("@id".into(), Value::String(entity.id.to_string()));

    let types = entity.body.type_names();
    let type_value = if types.len() == 1 {
        Value::String(types[0].to_string())
    } else {
        Value::Array(types.iter().map(|t| Value::String(t.to_string())).collect())
    };
    map.insert("@type".into(), type_value);
    map.insert("name".into(), Value::String(entity.body.name().to_string()));

    match &entity.body {
        EntityBody::Step(step) => {
            map.insert("position".into(), json!(step.position));
            put_opt(&mut map, "encodingFormat", step.encoding_format.clone());
            put_opt(&mut map, "codeRepository", step.code_repository.clone());
            put_opt(&mut map, "sha256", step.sha256.clone());
        }
        EntityBody::Code(code) => {
            map.insert("sha256".into(), Value::String(code.sha256.clone()));
            map.insert("text".into(), Value::String(code.text.clone()));
        }
        EntityBody::CreateAction(_) => {}
        EntityBody::FormalParameter(param) => {
            map.insert("additionalType".into(), Value::String(param.additional_type.clone()));
            map.insert("valueRequired".into(), Value::Bool(param.value_required));
            if param.version.is_some() {
                map.insert("identifier".into(), Value::String(entity.id.to_string()));
                put_opt(&mut map, "version", param.version);
            }
        }
        EntityBody::File(file) => {
            put_opt(&mut map, "sha256", file.sha256.clone());
            put_opt(&mut map, "contentSize", file.size);
            put_opt(&mut map, "description", file.description.clone());
        }
        EntityBody::Media(media) => {
            map.insert("encodingFormat".into(), Value::String(media.encoding_format.clone()));
        }
        EntityBody::Workflow(wf) => {
            put_opt(&mut map, "description", wf.description.clone());
            put_opt(&mut map, "encodingFormat", wf.encoding_format.clone());
            put_opt(&mut map, "codeRepository", wf.code_repository.clone());
            put_opt(&mut map, "sha256", wf.sha256.clone());
        }
        EntityBody::Tool(tool) => {
            map.insert("identifier".into(), Value::String(tool.identifier.clone()));
            map.insert("version".into(), Value::String(tool.version.clone()));
            map.insert("softwareVersion".into(), Value::String(tool.version.clone()));
            map.insert(
                "programmingLanguage".into(),
                Value::String(tool.programming_language.clone()),
            );
            map.insert("description".into(), Value::String(tool.description.clone()));
        }
        EntityBody::Language(lang) => {
            put_opt(&mut map, "url", lang.url.clone());
            put_opt(&mut map, "description", lang.description.clone());
        }
        EntityBody::Collection(c) => {
            put_opt(&mut map, "description", c.description.clone());
            put_opt(&mut map, "datePublished", c.date_published.map(|d| d.to_rfc3339()));
            put_opt(&mut map, "version", c.version.clone());
        }
        EntityBody::NestedGraph(n) => {
            map.insert("description".into(), Value::String(n.description.clone()));
        }
    }

    for (relation, targets) in entity.relations.iter() {
        if targets.is_empty() {
            continue;
        }
        let value = if relation.is_single_valued() && targets.len() == 1 {
            id_ref(targets.as_slice()[0].as_str())
        } else {
            Value::Array(targets.iter().map(|t| id_ref(t.as_str())).collect())
        };
        map.insert(relation.as_str().to_string(), value);
    }

    for (key, value) in &entity.extra {
        map.entry(key.clone())
            .or_insert_with(|| serde_json::to_value(value).unwrap_or(Value::Null));
    }

    Value::Object(map)
}
