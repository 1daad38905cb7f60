mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

struct Seeded {
    shared: Value,
    ops: Value,
    ops_translation: Value,
}

async fn seed(server: &TestServer) -> Result<Seeded> {
    let root = common::root_token();
    let shared = server.ok(&root, "SaveDataSetCommand", json!({ "Name": "Shared" })).await?;
    let team = server
        .ok(&root, "SaveDataSetCommand", json!({ "Name": "Team", "AllowedIdentityIds": ["alice"] }))
        .await?;
    let ops = server
        .ok(&root, "SaveDataSetCommand", json!({ "Name": "Ops", "AllowedIdentityIds": ["carol"] }))
        .await?;

    let mut ops_translation = Value::Null;
    for (name, data_set) in [("Save", &shared), ("Cancel", &team), ("Restart", &ops), ("Orphan", &Value::Null)] {
        let id = server
            .ok(
                &root,
                "SaveTranslationCommand",
                json!({
                    "InternalGroupName": "Common",
                    "ResourceName": "Buttons",
                    "TranslationName": name,
                    "CultureName": "en-US",
                    "Content": name,
                    "DataSetId": data_set,
                }),
            )
            .await?;
        if name == "Restart" {
            ops_translation = id;
        }
    }
    Ok(Seeded { shared, ops, ops_translation })
}

fn names(page: &Value, field: &str) -> Vec<String> {
    let mut names: Vec<String> = page["Items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i[field].as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn users_only_see_allowed_and_public_data() -> Result<()> {
    let server = TestServer::spawn().await?;
    let seeded = seed(&server).await?;
    let alice = common::token_for("alice");

    let page = server.ok(&alice, "GetTranslationsQuery", json!({})).await?;
    assert_eq!(names(&page, "TranslationName"), vec!["Cancel", "Save"]);
    assert_eq!(page["TotalItems"], 2);

    let data_sets = server.ok(&alice, "GetDataSetsQuery", json!({})).await?;
    assert_eq!(names(&data_sets, "Name"), vec!["Shared", "Team"]);

    let hidden = server.ok(&alice, "GetTranslationByIdQuery", json!({ "Id": seeded.ops_translation })).await?;
    assert!(hidden.is_null());

    let root = server.ok(&common::root_token(), "GetTranslationsQuery", json!({})).await?;
    assert_eq!(root["TotalItems"], 4);

    let carol = server.ok(&common::token_for("carol"), "GetDataSetByIdQuery", json!({ "Id": seeded.ops })).await?;
    assert_eq!(carol["Name"], "Ops");
    assert_eq!(carol["AllowedIdentityIds"], json!(["carol"]));
    Ok(())
}

#[tokio::test]
async fn writing_into_a_foreign_data_set_is_forbidden() -> Result<()> {
    let server = TestServer::spawn().await?;
    let seeded = seed(&server).await?;
    let alice = common::token_for("alice");

    let (status, body) = server
        .query(
            &alice,
            "SaveTranslationCommand",
            json!({
                "InternalGroupName": "Common",
                "ResourceName": "Buttons",
                "TranslationName": "Sneaky",
                "CultureName": "en-US",
                "Content": "x",
                "DataSetId": seeded.ops,
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = server
        .query(
            &alice,
            "SaveTranslationCommand",
            json!({
                "InternalGroupName": "Common",
                "ResourceName": "Buttons",
                "TranslationName": "Fine",
                "CultureName": "en-US",
                "Content": "x",
                "DataSetId": seeded.shared,
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let deleted = server.ok(&alice, "DeleteTranslationCommand", json!({ "Id": seeded.ops_translation })).await?;
    assert_eq!(deleted, json!(false));
    Ok(())
}

#[tokio::test]
async fn credentials_are_checked_when_required() -> Result<()> {
    let mut config = common::test_config();
    config.security.require_authentication = true;
    let server = TestServer::spawn_with(config).await?;

    let res = server.client.get(server.url("/api/requests")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.url("/api/requests")).bearer_auth("garbage").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/api/requests"))
        .bearer_auth(common::token_for("alice"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .get(server.url("/api/requests"))
        .header("X-API-Key", common::API_KEY)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .get(server.url("/api/requests"))
        .header("X-API-Key", "wrong-key")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn api_key_callers_see_public_data_only() -> Result<()> {
    let server = TestServer::spawn().await?;
    seed(&server).await?;

    let res = server
        .client
        .post(server.url("/api/query/GetTranslationsQuery"))
        .header("X-API-Key", common::API_KEY)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(names(&body["data"], "TranslationName"), vec!["Save"]);
    Ok(())
}

#[tokio::test]
async fn only_root_writes_translations_without_a_data_set() -> Result<()> {
    let server = TestServer::spawn().await?;
    seed(&server).await?;
    let loose = json!({
        "InternalGroupName": "Common",
        "ResourceName": "Buttons",
        "TranslationName": "Loose",
        "CultureName": "en-US",
        "Content": "x",
    });

    let (status, body) = server.query(&common::token_for("alice"), "SaveTranslationCommand", loose.clone()).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = server.query(&common::root_token(), "SaveTranslationCommand", loose).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn hidden_data_sets_cannot_be_included() -> Result<()> {
    let server = TestServer::spawn().await?;
    let seeded = seed(&server).await?;
    let alice = common::token_for("alice");

    let include = |id: &Value| json!({ "Name": "Bundle", "IncludedDataSetIds": [id] });
    let missing = json!(uuid::Uuid::new_v4().to_string());

    let (hidden_status, hidden_body) = server.query(&alice, "SaveDataSetCommand", include(&seeded.ops)).await?;
    let (missing_status, missing_body) = server.query(&alice, "SaveDataSetCommand", include(&missing)).await?;
    assert_eq!(hidden_status, StatusCode::BAD_REQUEST);
    assert_eq!(hidden_status, missing_status);
    assert_eq!(hidden_body["code"], missing_body["code"]);

    let redact = |body: &Value, id: &Value| {
        body["message"].as_str().unwrap_or_default().replace(id.as_str().unwrap_or_default(), "<id>")
    };
    assert_eq!(redact(&hidden_body, &seeded.ops), redact(&missing_body, &missing));

    let (status, _) = server.query(&alice, "SaveDataSetCommand", include(&seeded.shared)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
