//! End-to-end assembly of a scratch pipeline project

mod common;

use common::{FixtureProject, BASE_URL, COMMIT};
use provgraph::graph::{EntityBody, EntityId, Relation};
use provgraph::pipeline::MAIN_ENTITY_ID;
use provgraph::storage::METADATA_FILE;
use provgraph::{
    AssemblerConfig, ErrorKind, FileLimit, GraphStore, OpenStore, PipelineAssembler,
    PipelineProvenance, SqliteStore, StaticResolver, VersioningOrder,
};

fn ids(list: &[&str]) -> Vec<EntityId> {
    list.iter().map(|s| EntityId::from(*s)).collect()
}

fn assemble(project: &FixtureProject, config: AssemblerConfig) -> PipelineProvenance {
    let resolver = project.resolver();
    PipelineAssembler::new(project.path(), config, &resolver)
        .assemble()
        .expect("assembly succeeds")
}

fn permalink(path: &str) -> EntityId {
    EntityId::new(format!("{}/blob/{}/{}", BASE_URL, COMMIT, path))
}

#[test]
fn repeated_notebooks_get_unique_step_ids() {
    let project = FixtureProject::shoreline();
    let prov = assemble(&project, AssemblerConfig::default());

    let workflow = EntityId::from("update.sh");
    assert_eq!(
        prov.graph.targets(&workflow, Relation::Step),
        &ids(&["analysis.ipynb", "analysis-2.ipynb", "export.ipynb", "make_xlsx.py"])[..]
    );

    let second = prov.graph.get(&EntityId::from("analysis-2.ipynb")).unwrap();
    let step = second.body.as_step().unwrap();
    assert_eq!(step.position, 2);
    assert_eq!(step.name, "analysis.ipynb");
    assert_eq!(
        second.relations.targets(Relation::ExampleOfWork),
        &ids(&["notebooks/analysis-2/ro-crate-metadata.json"])[..]
    );
    assert_eq!(prov.notebooks.len(), 3);
}

#[test]
fn driver_workflow_and_main_entity() {
    let project = FixtureProject::shoreline();
    let prov = assemble(&project, AssemblerConfig::default());

    let main = EntityId::from(MAIN_ENTITY_ID);
    assert_eq!(prov.graph.main_entity(), Some(&main));
    assert_eq!(prov.graph.targets(&main, Relation::HasPart), &ids(&["update.sh"])[..]);
    match &prov.graph.get(&main).unwrap().body {
        EntityBody::Collection(c) => {
            assert_eq!(c.version.as_deref(), Some(format!("{}/commit/{}", BASE_URL, COMMIT).as_str()));
        }
        other => panic!("unexpected main entity {:?}", other),
    }

    match &prov.graph.get(&prov.workflow).unwrap().body {
        EntityBody::Workflow(w) => {
            let description = w.description.as_deref().unwrap();
            assert!(description.contains("# Refresh shoreline time series"));
            assert!(!description.contains("#!/bin/bash"));
            assert_eq!(w.code_repository, Some(permalink("update.sh").to_string()));
        }
        other => panic!("unexpected workflow {:?}", other),
    }
    assert_eq!(
        prov.graph.targets(&prov.workflow, Relation::ProgrammingLanguage),
        &ids(&["Bash"])[..]
    );
}

#[test]
fn parameters_are_versioned_across_steps() {
    let project = FixtureProject::shoreline();
    let prov = assemble(&project, AssemblerConfig::default());

    assert_eq!(prov.versioner.versions("transects"), vec![1, 2, 3, 4]);
    assert_eq!(prov.versioner.versions("transecttimeseries"), vec![1]);
    assert_eq!(prov.versioner.versions("transecttimeseriestidallycorrected"), vec![1, 2]);

    let first = EntityId::from("analysis.ipynb");
    assert_eq!(
        prov.graph.targets(&first, Relation::Input),
        &ids(&["#fp-transecttimeseries-1", "#fp-transects-1"])[..]
    );
    assert_eq!(
        prov.graph.targets(&first, Relation::Output),
        &ids(&["#fp-transecttimeseriestidallycorrected-1", "#fp-transects-2"])[..]
    );

    let export = EntityId::from("export.ipynb");
    assert_eq!(
        prov.graph.targets(&export, Relation::Input),
        &ids(&["#fp-transecttimeseriestidallycorrected-2"])[..]
    );

    assert_eq!(
        prov.graph.targets(&prov.workflow, Relation::Input),
        &ids(&["#fp-transecttimeseries-1", "#fp-transects-1"])[..]
    );
    assert_eq!(
        prov.graph.targets(&prov.workflow, Relation::Output),
        &ids(&["#fp-transects-4", "#fp-transecttimeseriestidallycorrected-2"])[..]
    );

    let cell = &prov.notebooks[1].provenance.cells[0];
    assert_eq!(cell.resolved_inputs, ids(&["#fp-transecttimeseries-1", "#fp-transects-2"]));
}

#[test]
fn versioning_order_changes_pipeline_inputs() {
    let project = FixtureProject::new();
    project
        .write("update.sh", "jupyter nbconvert --execute stage.ipynb\n")
        .notebook(
            "stage.ipynb",
            "Stage",
            &["x.to_csv('scratch.csv')", "y = pd.read_csv('scratch.csv')"],
        )
        .write("scratch.csv", "a\n");

    let prov = assemble(&project, AssemblerConfig::default());
    assert_eq!(prov.notebooks[0].provenance.cells[1].resolved_inputs, ids(&["#fp-scratch-1"]));
    assert_eq!(prov.graph.targets(&prov.workflow, Relation::Input), &ids(&["#fp-scratch-1"])[..]);
    assert_eq!(prov.graph.targets(&prov.workflow, Relation::Output), &ids(&["#fp-scratch-2"])[..]);

    let prov = assemble(
        &project,
        AssemblerConfig::default().with_versioning_order(VersioningOrder::CellByCell),
    );
    assert_eq!(prov.notebooks[0].provenance.cells[1].resolved_inputs, ids(&["#fp-scratch-1"]));
    assert!(prov.graph.targets(&prov.workflow, Relation::Input).is_empty());
    assert_eq!(prov.graph.targets(&prov.workflow, Relation::Output), &ids(&["#fp-scratch-1"])[..]);
}

#[test]
fn files_are_expanded_stamped_and_linked() {
    let project = FixtureProject::shoreline();
    let prov = assemble(&project, AssemblerConfig::default());

    // two per wildcard pattern plus the literal geojson
    assert_eq!(prov.files.len(), 5);

    let series = permalink("data/nzd0001/transect_time_series.csv");
    assert!(prov.graph.root().relations.targets(Relation::HasPart).contains(&series));
    assert!(!prov.graph.contains(&permalink("data/nzd0003/transect_time_series.csv")));
    assert_eq!(
        prov.graph.targets(&series, Relation::ExampleOfWork),
        &ids(&["#fp-transecttimeseries-1"])[..]
    );

    let transects = permalink("transects.geojson");
    assert_eq!(
        prov.graph.targets(&transects, Relation::ExampleOfWork),
        &ids(&["#fp-transects-1", "#fp-transects-4"])[..]
    );
    let body = prov.graph.get(&transects).unwrap().body.as_file().unwrap().clone();
    assert_eq!(body.commit_hash.as_deref(), Some(COMMIT));
    assert!(body.exists);
    assert!(body.sha256.is_some());
}

#[test]
fn unlimited_file_limit_takes_every_match() {
    let project = FixtureProject::shoreline();
    let prov = assemble(&project, AssemblerConfig::default().with_file_limit(FileLimit::Unlimited));
    assert_eq!(prov.files.len(), 7);
}

#[test]
fn previous_state_adds_files_for_rewritten_inputs() {
    let project = FixtureProject::shoreline();
    let resolver = StaticResolver::new(project.path(), BASE_URL, COMMIT)
        .with_previous_commit("fedcba9876543210")
        .with_previous_file("transects.geojson", "{}");
    let prov = PipelineAssembler::new(
        project.path(),
        AssemblerConfig::default().with_previous_state(true),
        &resolver,
    )
    .assemble()
    .unwrap();

    let before = EntityId::new(format!("{}/blob/fedcba9876543210/transects.geojson", BASE_URL));
    assert_eq!(prov.graph.targets(&before, Relation::ExampleOfWork), &ids(&["#fp-transects-1"])[..]);
    let body = prov.graph.get(&before).unwrap().body.as_file().unwrap().clone();
    assert_eq!(body.size, Some(2));
    assert!(body.exists);

    // time series are never rewritten, so only the current state is described
    assert!(!prov.graph.contains(&EntityId::new(format!(
        "{}/blob/fedcba9876543210/data/nzd0001/transect_time_series.csv",
        BASE_URL
    ))));
    assert_eq!(prov.files.len(), 6);
}

#[test]
fn previous_state_without_history_fails() {
    let project = FixtureProject::shoreline();
    let resolver = project.resolver();
    let err = PipelineAssembler::new(
        project.path(),
        AssemblerConfig::default().with_previous_state(true),
        &resolver,
    )
    .assemble()
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn missing_driver_script_is_not_found() {
    let project = FixtureProject::new();
    let resolver = project.resolver();
    let err = PipelineAssembler::new(project.path(), AssemblerConfig::default(), &resolver)
        .assemble()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn missing_step_file_is_not_found() {
    let project = FixtureProject::new();
    project.write("update.sh", "jupyter nbconvert --execute ghost.ipynb\n");
    let resolver = project.resolver();
    let err = PipelineAssembler::new(project.path(), AssemblerConfig::default(), &resolver)
        .assemble()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("ghost.ipynb"));
}

#[test]
fn custom_driver_script_name() {
    let project = FixtureProject::new();
    project
        .write("run.sh", "jupyter nbconvert --execute only.ipynb\n")
        .notebook("only.ipynb", "Only", &["print('hi')"]);
    let prov = assemble(&project, AssemblerConfig::default().with_driver_script("run.sh"));
    assert_eq!(prov.workflow.as_str(), "run.sh");
    assert!(prov.files.is_empty());
}

#[test]
fn write_produces_nested_documents() {
    let project = FixtureProject::shoreline();
    let prov = assemble(&project, AssemblerConfig::default());
    let out = tempfile::tempdir().unwrap();
    let path = prov.write(out.path()).unwrap();

    assert_eq!(path, out.path().join(METADATA_FILE));
    for stem in ["analysis", "analysis-2", "export"] {
        let nested = out.path().join("notebooks").join(stem);
        assert!(nested.join(METADATA_FILE).is_file(), "{} document", stem);
        assert!(nested.join("code_blocks/cell_1.py").is_file());
    }

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let graph = doc["@graph"].as_array().unwrap();
    assert_eq!(graph[0]["@id"], "ro-crate-metadata.json");
    let workflow = graph.iter().find(|e| e["@id"] == "update.sh").unwrap();
    assert_eq!(workflow["step"].as_array().unwrap().len(), 4);
}

#[test]
fn graph_roundtrips_through_sqlite() {
    let project = FixtureProject::shoreline();
    let prov = assemble(&project, AssemblerConfig::default());

    let store = SqliteStore::open_in_memory().unwrap();
    store.save_graph(&prov.graph).unwrap();
    let loaded = store.load_graph(&prov.graph.name).unwrap().unwrap();

    assert_eq!(loaded.entity_count(), prov.graph.entity_count());
    assert_eq!(loaded.to_jsonld(), prov.graph.to_jsonld());
    assert_eq!(store.count_kind(&prov.graph.name, "step").unwrap(), 4);
}
