//! Chart payloads embedded in code cell outputs

use super::artifact::GeneratedFile;
use super::cells::CellRecord;
use super::format::Cell;
use crate::graph::{EntityBody, EntityId, GraphResult, MediaArtifact, ProvenanceGraph, Relation};
use serde_json::Value;
use tracing::warn;

/// Recognised chart MIME types and the short kind used in file names
const CHART_TYPES: [(&str, &str); 3] = [
    ("application/vnd.plotly.v1+json", "plotly"),
    ("application/vnd.vegalite.v5+json", "vegalite"),
    ("application/vnd.vegalite.v4+json", "vegalite"),
];

const MEDIA_DIR: &str = "plotly_results";

/// Extract chart outputs of `cell` into media artifacts.
///
/// The last chart becomes the `result` of the cell's create action.
pub fn collect_media(
    graph: &mut ProvenanceGraph,
    record: &mut CellRecord,
    cell: &Cell,
) -> GraphResult<Vec<GeneratedFile>> {
    let mut files = Vec::new();

    for (idx, output) in cell.outputs.iter().enumerate() {
        if !output.is_rich() {
            continue;
        }
        if output.data.is_none() {
            warn!(step = %record.step_id, output = idx + 1, "rich output without data, skipping");
            continue;
        }
        let Some(data) = output.bundle() else {
            warn!(step = %record.step_id, output = idx + 1, "output data is not a MIME bundle, skipping");
            continue;
        };
        let Some((mime, kind, payload)) = CHART_TYPES
            .iter()
            .find_map(|(mime, kind)| data.get(*mime).map(|p| (*mime, *kind, p)))
        else {
            continue;
        };
        if !matches!(payload, Value::Object(_) | Value::Array(_)) {
            warn!(step = %record.step_id, output = idx + 1, mime, "chart payload is not a JSON document, skipping");
            continue;
        }

        let relative_path = media_id(&record.step_id, kind, idx + 1).to_string();
        let contents = serde_json::to_vec(payload).unwrap_or_default();

        let media = graph.add_data_entity(
            relative_path.clone(),
            EntityBody::Media(MediaArtifact {
                name: format!("Chart from {}", record.step_id),
                encoding_format: mime.to_string(),
            }),
        );
        graph.set_relation(&record.action_id, Relation::Result, &media)?;
        record.result = Some(media);
        files.push(GeneratedFile::new(relative_path, contents));
    }

    Ok(files)
}

/// Identifier a media file would get for a given step and output index
pub fn media_id(step: &EntityId, kind: &str, output_index: usize) -> EntityId {
    EntityId::new(format!(
        "{}/{}_{}_{}.json",
        MEDIA_DIR,
        step.as_str().trim_start_matches('#'),
        kind,
        output_index
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::cells::build_cell;
    use crate::notebook::format::Notebook;
    use crate::notebook::parameters::LocalParameters;

    fn run(nb_json: &str) -> (ProvenanceGraph, CellRecord, Vec<GeneratedFile>) {
        let nb = Notebook::from_json(nb_json).unwrap();
        let mut graph = ProvenanceGraph::new("nb");
        let kernel = EntityId::from("#jupyter-kernel");
        let params = LocalParameters::default();
        let (mut record, _) = build_cell(&mut graph, 1, &nb.cells[0], &kernel, &params).unwrap();
        let files = collect_media(&mut graph, &mut record, &nb.cells[0]).unwrap();
        (graph, record, files)
    }

    #[test]
    fn plotly_output_becomes_result() {
        let (graph, record, files) = run(
            r#"{"cells": [{"cell_type": "code", "source": "fig.show()", "outputs": [
                {"output_type": "stream", "name": "stdout", "text": "x"},
                {"output_type": "display_data", "data": {"application/vnd.plotly.v1+json": {"data": []}}}
            ]}]}"#,
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "plotly_results/step-1_plotly_2.json");
        let expected = media_id(&record.step_id, "plotly", 2);
        assert_eq!(record.result.as_ref(), Some(&expected));
        assert_eq!(graph.targets(&record.action_id, Relation::Result), &[expected]);
    }

    #[test]
    fn vegalite_is_recognised() {
        let (_, _, files) = run(
            r#"{"cells": [{"cell_type": "code", "source": "chart", "outputs": [
                {"output_type": "execute_result", "data": {"application/vnd.vegalite.v5+json": {"mark": "bar"}}}
            ]}]}"#,
        );
        assert_eq!(files[0].relative_path, "plotly_results/step-1_vegalite_1.json");
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        let (_, record, files) = run(
            r#"{"cells": [{"cell_type": "code", "source": "x", "outputs": [
                {"output_type": "display_data"},
                {"output_type": "display_data", "data": ["not", "a", "bundle"]},
                {"data": {"application/vnd.plotly.v1+json": {"data": []}}},
                {"output_type": "display_data", "data": {"application/vnd.plotly.v1+json": "oops"}},
                {"output_type": "display_data", "data": {"text/plain": "hello"}}
            ]}]}"#,
        );
        assert!(files.is_empty());
        assert!(record.result.is_none());
    }

    #[test]
    fn last_chart_wins() {
        let (graph, record, files) = run(
            r#"{"cells": [{"cell_type": "code", "source": "x", "outputs": [
                {"output_type": "display_data", "data": {"application/vnd.plotly.v1+json": {"a": 1}}},
                {"output_type": "display_data", "data": {"application/vnd.plotly.v1+json": {"b": 2}}}
            ]}]}"#,
        );
        assert_eq!(files.len(), 2);
        assert_eq!(
            graph.targets(&record.action_id, Relation::Result),
            &[media_id(&record.step_id, "plotly", 2)]
        );
    }
}
