#![allow(dead_code)]

use httpmock::prelude::*;
use serde_json::{json, Value};

// base64(":pat")
pub const AUTH: &str = "Basic OnBhdA==";

fn child(org_path: &str, id: i64) -> Value {
    json!({
        "rel": "System.LinkTypes.Hierarchy-Forward",
        "url": format!("https://dev.azure.com{}/_apis/wit/workItems/{}", org_path, id)
    })
}

fn batch_mock(server: &MockServer, org_path: &str, ids: &[i64], items: Value) {
    let path = format!("{}/_apis/wit/workitemsbatch", org_path);
    let ids = ids.to_vec();
    server.mock(move |when, then| {
        when.method(POST)
            .path(path)
            .query_param("api-version", "7.1")
            .header("Authorization", AUTH)
            .json_body(json!({
                "ids": ids,
                "$expand": "Relations",
                "errorPolicy": "Omit"
            }));
        then.status(200)
            .json_body(json!({"count": items.as_array().map_or(0, Vec::len), "value": items}));
    });
}

/// Epic 100 with an open task (jdoe, 3h functionality), a closed bug and a
/// feature whose task (asmith, 2h untagged) sits one level deeper. Work item
/// 999 does not exist.
pub fn mock_hierarchy(server: &MockServer, org_path: &str) {
    let root_path = format!("{}/_apis/wit/workitems/100", org_path);
    server.mock(move |when, then| {
        when.method(GET)
            .path(root_path)
            .query_param("fields", "System.Title")
            .header("Authorization", AUTH);
        then.status(200).json_body(json!({
            "id": 100,
            "fields": {"System.Title": "Release 1"}
        }));
    });

    let missing_path = format!("{}/_apis/wit/workitems/999", org_path);
    server.mock(move |when, then| {
        when.method(GET).path(missing_path);
        then.status(404).json_body(json!({"message": "TF401232: Work item 999 does not exist"}));
    });

    batch_mock(
        server,
        org_path,
        &[100],
        json!([{
            "id": 100,
            "fields": {"System.WorkItemType": "Epic", "System.State": "Active"},
            "relations": [child(org_path, 101), child(org_path, 102), child(org_path, 103)]
        }]),
    );

    batch_mock(
        server,
        org_path,
        &[101, 102, 103],
        json!([
            {
                "id": 101,
                "fields": {
                    "System.WorkItemType": "Task",
                    "System.State": "Active",
                    "System.Tags": "Functionality; Backend",
                    "System.AssignedTo": {"uniqueName": "jdoe@contoso.com"},
                    "Microsoft.VSTS.Scheduling.RemainingWork": 3.0
                }
            },
            {
                "id": 102,
                "fields": {
                    "System.WorkItemType": "Bug",
                    "System.State": "Closed",
                    "System.AssignedTo": {"uniqueName": "jdoe@contoso.com"},
                    "Microsoft.VSTS.Scheduling.RemainingWork": 8.0
                }
            },
            {
                "id": 103,
                "fields": {"System.WorkItemType": "Feature", "System.State": "New"},
                "relations": [child(org_path, 104)]
            }
        ]),
    );

    batch_mock(
        server,
        org_path,
        &[104],
        json!([{
            "id": 104,
            "fields": {
                "System.WorkItemType": "Task",
                "System.State": "New",
                "System.AssignedTo": {"uniqueName": "asmith@contoso.com"},
                "Microsoft.VSTS.Scheduling.RemainingWork": "2"
            }
        }]),
    );
}
