// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project data serialization and deserialization.
//!
//! This module handles saving and loading projects and color point files
//! in YAML and JSON formats. The format is picked from the file
//! extension.

use crate::models::color_point::{ColorPoint, FramePointSet, Rgb};
use crate::models::project::{ProjectFile, ProjectState};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk format of a project or point file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => bail!("Unsupported file extension: {:?}", extension),
        }
    }
}

/// One entry of a color point file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointFileEntry {
    pub point: [i64; 2],
    pub color: Rgb,
    /// Color the user picked, before any adjustment. Mirrors `color`.
    #[serde(default)]
    pub user_color: Option<Rgb>,
}

fn write_as<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let text = match Format::from_path(path)? {
        Format::Yaml => serde_yaml::to_string(data)?,
        Format::Json => serde_json::to_string_pretty(data)?,
    };
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn read_as<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data = match format {
        Format::Yaml => serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to import YAML from {}", path.display()))?,
        Format::Json => serde_json::from_str(&text)
            .with_context(|| format!("Failed to import JSON from {}", path.display()))?,
    };
    Ok(data)
}

/// Save the whole project. Frames without points are left out.
pub fn save_project(project: &ProjectState, path: &Path) -> Result<()> {
    write_as(&project.to_file(), path)?;
    log::info!(
        "Saved project to {} ({} points on {} frames)",
        path.display(),
        project.total_points(),
        project.annotated_frames().count()
    );
    Ok(())
}

/// Load a project. Nothing is returned unless the whole file parsed.
pub fn load_project(path: &Path) -> Result<ProjectState> {
    let file: ProjectFile = read_as(path)?;
    let project = ProjectState::from_file(file);
    log::info!(
        "Loaded project from {} ({} points)",
        path.display(),
        project.total_points()
    );
    Ok(project)
}

pub fn export_points(points: &FramePointSet, path: &Path) -> Result<()> {
    let entries: Vec<PointFileEntry> = points
        .iter()
        .map(|p| PointFileEntry {
            point: [p.x as i64, p.y as i64],
            color: p.color,
            user_color: Some(p.color),
        })
        .collect();
    write_as(&entries, path)?;
    log::info!("Exported {} points to {}", entries.len(), path.display());
    Ok(())
}

/// Read a point file, keeping only points inside a `width x height` frame.
pub fn import_points(path: &Path, width: u32, height: u32) -> Result<FramePointSet> {
    let entries: Vec<PointFileEntry> = read_as(path)?;
    let points: FramePointSet = entries
        .iter()
        .filter_map(|e| ColorPoint::checked(e.point[0], e.point[1], e.color, width, height))
        .collect();
    log::info!(
        "Imported {} of {} points from {}",
        points.len(),
        entries.len(),
        path.display()
    );
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("chromahint-{}-{}", std::process::id(), name))
    }

    fn sample_project() -> ProjectState {
        let mut project = ProjectState::new("clips/intro".into());
        project.current_frame = 4;
        project.set_points(
            0,
            [ColorPoint::new(1, 2, [10, 20, 30]), ColorPoint::new(5, 6, [1, 1, 1])]
                .into_iter()
                .collect(),
        );
        project.set_points(7, [ColorPoint::new(0, 0, [255, 0, 0])].into_iter().collect());
        project
    }

    #[test]
    fn test_project_yaml_and_json() {
        let project = sample_project();
        for name in ["project.yaml", "project.json"] {
            let path = scratch(name);
            save_project(&project, &path).unwrap();
            assert_eq!(load_project(&path).unwrap(), project);
            std::fs::remove_file(&path).unwrap();
        }
    }

    #[test]
    fn test_project_json_keys() {
        let path = scratch("keys.json");
        save_project(&sample_project(), &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["videoFile"], "clips/intro");
        assert_eq!(value["currentFrame"], 4);
        assert_eq!(
            value["colorPoints"]["7"],
            serde_json::json!([{ "point": [0, 0], "color": [255, 0, 0] }])
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_failures_are_errors() {
        assert!(load_project(&scratch("missing.json")).is_err());
        assert!(load_project(Path::new("project.txt")).is_err());

        let path = scratch("broken.json");
        std::fs::write(&path, "{\"videoFile\": 3").unwrap();
        assert!(load_project(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_point_file_filtered_on_import() {
        let path = scratch("points.json");
        std::fs::write(
            &path,
            r#"[
                {"point": [2, 3], "color": [9, 8, 7], "userColor": [9, 8, 7]},
                {"point": [20, 3], "color": [1, 1, 1], "userColor": [1, 1, 1]},
                {"point": [-1, 0], "color": [2, 2, 2]},
                {"point": [9, 9], "color": [3, 3, 3]}
            ]"#,
        )
        .unwrap();

        let points = import_points(&path, 10, 10).unwrap();
        assert_eq!(
            points.as_slice(),
            &[ColorPoint::new(2, 3, [9, 8, 7]), ColorPoint::new(9, 9, [3, 3, 3])]
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_point_export_shape() {
        let path = scratch("export.yaml");
        let points: FramePointSet = [ColorPoint::new(4, 5, [6, 7, 8])].into_iter().collect();
        export_points(&points, &path).unwrap();

        let entries: Vec<PointFileEntry> =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            entries,
            vec![PointFileEntry {
                point: [4, 5],
                color: [6, 7, 8],
                user_color: Some([6, 7, 8]),
            }]
        );
        assert_eq!(import_points(&path, 10, 10).unwrap(), points);
        std::fs::remove_file(&path).unwrap();
    }
}
