//! Scratch pipeline projects for integration tests

use provgraph::StaticResolver;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://github.com/example/shorelines";
pub const COMMIT: &str = "0123456789abcdef";

/// A project directory that lives as long as the fixture
pub struct FixtureProject {
    dir: TempDir,
}

/// nbformat v4 JSON with one code cell per source string
pub fn notebook_json(title: &str, cells: &[&str]) -> Value {
    let mut all = vec![json!({
        "cell_type": "markdown",
        "metadata": {},
        "source": [format!("# {}\n", title)]
    })];
    all.extend(cells.iter().map(|source| {
        json!({
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": source.lines().map(|l| format!("{}\n", l)).collect::<Vec<_>>()
        })
    }));
    json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {
            "kernelspec": {"name": "python3", "display_name": "Python 3", "language": "python"},
            "language_info": {"name": "python", "version": "3.11.4"}
        },
        "cells": all
    })
}

impl FixtureProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parent directories
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, contents).expect("write fixture file");
        self
    }

    pub fn notebook(&self, relative: &str, title: &str, cells: &[&str]) -> &Self {
        let text = serde_json::to_string_pretty(&notebook_json(title, cells)).expect("serialize notebook");
        self.write(relative, text)
    }

    /// Offline resolver over this project's working tree
    pub fn resolver(&self) -> StaticResolver {
        StaticResolver::new(self.path(), BASE_URL, COMMIT)
    }

    /// Shoreline pipeline: `analysis.ipynb` runs twice, then `export.ipynb`,
    /// then `make_xlsx.py`. Three sites carry both time series files.
    pub fn shoreline() -> Self {
        let project = Self::new();
        project.write(
            "update.sh",
            "#!/bin/bash\n\
             # Refresh shoreline time series\n\
             set -e\n\
             jupyter nbconvert --to notebook --execute analysis.ipynb --inplace\n\
             # Second pass picks up corrected transects\n\
             jupyter nbconvert --to notebook --execute analysis.ipynb --inplace\n\
             jupyter nbconvert --to notebook --execute export.ipynb --inplace\n\
             ./make_xlsx.py\n",
        );
        project.notebook(
            "analysis.ipynb",
            "Tidal correction",
            &[
                "ts = pd.read_csv(f'data/{sitename}/transect_time_series.csv')\ngdf = gpd.read_file('transects.geojson')",
                "gdf.to_file('transects.geojson')\nts.to_csv(f'data/{sitename}/transect_time_series_tidally_corrected.csv')",
            ],
        );
        project.notebook(
            "export.ipynb",
            "Export",
            &["df = pd.read_csv(f'data/{site}/transect_time_series_tidally_corrected.csv')\ngdf.to_file('transects.geojson')"],
        );
        project.write("make_xlsx.py", "#!/usr/bin/env python3\nprint('xlsx')\n");
        project.write("transects.geojson", "{\"type\": \"FeatureCollection\"}");
        for site in ["nzd0001", "nzd0002", "nzd0003"] {
            project.write(&format!("data/{}/transect_time_series.csv", site), "dates,t1\n");
            project.write(
                &format!("data/{}/transect_time_series_tidally_corrected.csv", site),
                "dates,t1\n",
            );
        }
        project
    }
}
