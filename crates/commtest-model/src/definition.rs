use chrono::{DateTime, Utc};
use commtest_core::{AssetId, InputId, JobId, TestId};
use serde::{Deserialize, Serialize};

use crate::input::{InputKind, TestInput};
use crate::nested::{CellContent, NestedTableLayout};

/// Creation payload: a test before the backend assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    pub inputs: Vec<TestInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: TestId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub job_id: JobId,
    #[serde(default)]
    pub asset_id: Option<AssetId>,
    #[serde(default)]
    pub asset_type: Option<String>,
    pub inputs: Vec<TestInput>,
    pub created_at: DateTime<Utc>,
}

impl TestDefinition {
    #[must_use]
    pub fn from_new(id: TestId, new: NewTest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            instructions: new.instructions,
            job_id: new.job_id,
            asset_id: new.asset_id,
            asset_type: new.asset_type,
            inputs: new.inputs,
            created_at,
        }
    }

    /// Inputs sorted by their ordering position, ties kept in stored order.
    #[must_use]
    pub fn ordered_inputs(&self) -> Vec<&TestInput> {
        let mut out: Vec<&TestInput> = self.inputs.iter().collect();
        out.sort_by_key(|i| i.position);
        out
    }

    #[must_use]
    pub fn input(&self, id: &InputId) -> Option<&TestInput> {
        self.inputs.iter().find(|i| &i.id == id)
    }

    #[must_use]
    pub fn summary(&self) -> DefinitionSummary {
        let mut summary = DefinitionSummary::default();
        for input in &self.inputs {
            match &input.kind {
                InputKind::Scalar(s) => {
                    summary.scalar_inputs += 1;
                    if s.expectation.has_bounds() {
                        summary.expectation_inputs += 1;
                    }
                }
                InputKind::Table(layout) => {
                    summary.table_inputs += 1;
                    summary.table_cells += layout.enabled_cells().count();
                }
                InputKind::NestedTable(layout) => {
                    summary.nested_table_inputs += 1;
                    summary.nested_input_cells += count_nested_inputs(layout);
                }
                InputKind::MissingLayout(_) => summary.unconfigured_inputs += 1,
            }
        }
        summary
    }
}

fn count_nested_inputs(layout: &NestedTableLayout) -> usize {
    layout
        .cells
        .iter()
        .map(|c| match &c.content {
            CellContent::Input(_) => 1,
            CellContent::NestedTable { nested_table } => count_nested_inputs(nested_table),
            CellContent::Empty | CellContent::Header { .. } => 0,
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefinitionSummary {
    pub scalar_inputs: usize,
    pub expectation_inputs: usize,
    pub table_inputs: usize,
    pub table_cells: usize,
    pub nested_table_inputs: usize,
    pub nested_input_cells: usize,
    pub unconfigured_inputs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub job_id: Option<JobId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
}
