// SPDX-License-Identifier: Apache-2.0

use commtest_core::{AssetId, InputId};
use commtest_model::{
    CellContent, CellInput, CellPosition, ExpectedType, InputKind, InputType, LayoutKind,
    NestedTableLayout, ResponseValue, ScalarType, TestInput, TestResult, TestResultResponse,
};
use serde_json::json;

#[test]
fn scalar_input_record_decodes_into_typed_kind() {
    let raw = json!({
        "id": "ir-1",
        "label": "Insulation resistance",
        "input_type": "number",
        "position": 0,
        "unit": "MΩ",
        "expected_type": "minimum",
        "expected_min": 1.0
    });
    let input: TestInput = serde_json::from_value(raw).expect("decode");
    match &input.kind {
        InputKind::Scalar(s) => {
            assert_eq!(s.value_type, ScalarType::Number);
            assert_eq!(s.unit.as_deref(), Some("MΩ"));
            assert_eq!(s.expectation.expected_type, ExpectedType::Minimum);
            assert_eq!(s.expectation.expected_min, Some(1.0));
        }
        other => panic!("unexpected kind {other:?}"),
    }
    assert_eq!(input.input_type(), InputType::Number);
}

#[test]
fn table_input_without_layout_is_kept_as_missing_layout() {
    let raw = json!({"id": "grid", "label": "Grid", "input_type": "table"});
    let input: TestInput = serde_json::from_value(raw).expect("decode");
    assert_eq!(input.kind, InputKind::MissingLayout(LayoutKind::Table));

    let raw = json!({"id": "deep", "label": "Deep", "input_type": "nested_table"});
    let input: TestInput = serde_json::from_value(raw).expect("decode");
    assert_eq!(input.kind, InputKind::MissingLayout(LayoutKind::NestedTable));
}

#[test]
fn table_input_encodes_only_its_layout() {
    let raw = json!({
        "id": "phases",
        "label": "Phase readings",
        "input_type": "table",
        "expected_min": 4.0,
        "table_layout": {
            "columns": ["L1", "L2"],
            "rows": ["Voltage"],
            "cells": [
                {"rowIndex": 0, "columnIndex": 0, "enabled": true, "inputType": "number"},
                {"rowIndex": 0, "columnIndex": 1, "enabled": false}
            ]
        }
    });
    let input: TestInput = serde_json::from_value(raw).expect("decode");
    let encoded = serde_json::to_value(&input).expect("encode");
    assert!(encoded.get("expected_min").is_none());
    assert_eq!(encoded["table_layout"]["columns"], json!(["L1", "L2"]));
    assert_eq!(encoded["table_layout"]["cells"][1]["inputType"], json!("number"));
}

#[test]
fn nested_cells_are_tagged_by_cell_type() {
    let mut layout = NestedTableLayout::new(1, 3);
    layout.cells[0].content = CellContent::Header {
        header_text: "Phase".to_string(),
    };
    layout.cells[1].content = CellContent::Input(CellInput::of_type(ScalarType::Boolean));
    layout.cells[2].content = CellContent::NestedTable {
        nested_table: Box::new(NestedTableLayout::new(1, 1)),
    };

    let value = serde_json::to_value(&layout).expect("encode");
    assert_eq!(value["cells"][0]["cellType"], json!("header"));
    assert_eq!(value["cells"][0]["headerText"], json!("Phase"));
    assert_eq!(value["cells"][1]["cellType"], json!("input"));
    assert_eq!(value["cells"][1]["inputType"], json!("boolean"));
    assert_eq!(value["cells"][2]["nestedTable"]["rows"], json!(1));
    assert!(value["cells"][0].get("rowSpan").is_none());

    let decoded: NestedTableLayout = serde_json::from_value(value).expect("decode");
    assert_eq!(decoded, layout);
}

#[test]
fn spans_default_to_one_when_absent() {
    let raw = json!({
        "rows": 1,
        "columns": 2,
        "cells": [{"id": "cell_0_0", "rowIndex": 0, "columnIndex": 0, "colSpan": 2, "cellType": "empty"}]
    });
    let layout: NestedTableLayout = serde_json::from_value(raw).expect("decode");
    assert_eq!(layout.cells[0].row_span, 1);
    assert_eq!(layout.cells[0].col_span, 2);
    assert!(layout.validate().is_ok());
}

#[test]
fn legacy_singular_asset_id_is_folded_into_asset_ids() {
    let raw = json!({
        "id": "res-1",
        "test_id": "test-1",
        "asset_id": "asset-a",
        "responses": [],
        "status": "submitted",
        "created_at": "2026-03-01T10:00:00Z"
    });
    let result: TestResult = serde_json::from_value(raw).expect("decode");
    assert_eq!(result.asset_ids, vec![AssetId::new("asset-a").expect("id")]);
    assert_eq!(result.updated_at, result.created_at);

    let encoded = serde_json::to_value(&result).expect("encode");
    assert!(encoded.get("asset_id").is_none());
    assert_eq!(encoded["asset_ids"], json!(["asset-a"]));
}

#[test]
fn responses_carry_cell_coordinates_only_for_tables() {
    let scalar = TestResultResponse::scalar(
        InputId::new("ir-1").expect("id"),
        Some(ResponseValue::Number(0.5)),
    );
    let value = serde_json::to_value(&scalar).expect("encode");
    assert_eq!(value, json!({"inputId": "ir-1", "value": 0.5}));

    let cell = TestResultResponse {
        table_cell_position: Some(CellPosition::new(1, 0)),
        nested_path: vec![CellPosition::new(0, 1)],
        ..scalar
    };
    let value = serde_json::to_value(&cell).expect("encode");
    assert_eq!(value["tableCellPosition"], json!({"rowIndex": 1, "columnIndex": 0}));
    assert_eq!(
        cell.cell_path(),
        vec![CellPosition::new(1, 0), CellPosition::new(0, 1)]
    );
}

#[test]
fn response_values_decode_by_json_type() {
    let values: Vec<Option<ResponseValue>> =
        serde_json::from_value(json!([true, 4.4, "ok", null])).expect("decode");
    assert_eq!(
        values,
        vec![
            Some(ResponseValue::Boolean(true)),
            Some(ResponseValue::Number(4.4)),
            Some(ResponseValue::Text("ok".to_string())),
            None
        ]
    );
}
