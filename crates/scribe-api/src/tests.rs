//! Router tests against an in-memory store, a temporary blob directory and a
//! scripted text generator.

use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use scribe_blob::FsBlobStore;
use scribe_core::{
  Operation, User,
  blob::BlobStore,
  generator::TextGenerator,
  store::{OperationStore, UserDirectory},
};
use scribe_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, Backend, ServerConfig, extract::HOOK_SECRET_HEADER, router};

// ─── Harness ─────────────────────────────────────────────────────────────────

/// Echoes the prompt back, or fails when it mentions `fail`.
struct Scripted;

impl TextGenerator for Scripted {
  type Error = std::io::Error;

  async fn complete(&self, prompt: String) -> Result<String, std::io::Error> {
    if prompt.contains("fail") {
      Err(std::io::Error::other("scripted failure"))
    } else {
      Ok(format!("generated: {prompt}"))
    }
  }
}

struct TestBackend;

impl Backend for TestBackend {
  type Store = SqliteStore;
  type Blob = FsBlobStore;
  type Generator = Scripted;
}

const PUBLIC_URL: &str = "http://localhost:8080";
const HOOK_SECRET: &str = "test-secret";

struct Harness {
  state: AppState<TestBackend>,
  _dir:  TempDir,
}

async fn harness() -> Harness {
  let dir = tempfile::tempdir().unwrap();
  let store = SqliteStore::open_in_memory().await.unwrap();
  store.upsert_user(User::new("alice", "Alice"), "alice".into()).await.unwrap();
  store.upsert_user(User::new("bob", "Bob"), "bob".into()).await.unwrap();

  let state = AppState {
    store:     Arc::new(store),
    blob:      Arc::new(FsBlobStore::new(dir.path(), PUBLIC_URL)),
    generator: Arc::new(Scripted),
    config:    Arc::new(ServerConfig { hook_secret: HOOK_SECRET.into(), ..ServerConfig::default() }),
  };
  Harness { state, _dir: dir }
}

impl Harness {
  async fn send(
    &self,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header("x-user-id", user);
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = router(self.state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  /// Call a hook route, presenting `secret` when given.
  async fn hook(&self, uri: &str, secret: Option<&str>, body: Value) -> (StatusCode, String) {
    let mut builder =
      Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
      builder = builder.header(HOOK_SECRET_HEADER, secret);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    let resp = router(self.state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  /// PUT `body` to a blob route path.
  async fn put_blob(&self, path: &str, body: &str) -> StatusCode {
    let req = Request::builder().method("PUT").uri(path).body(Body::from(body.to_owned())).unwrap();
    router(self.state.clone()).oneshot(req).await.unwrap().status()
  }

  async fn json(&self, method: &str, uri: &str, user: &str, body: Value) -> (StatusCode, String) {
    self.send(method, uri, Some(user), Some(body)).await
  }

  async fn get(&self, uri: &str, user: &str) -> Value {
    let (status, body) = self.send("GET", uri, Some(user), None).await;
    assert_eq!(status, StatusCode::OK, "{uri}: {body}");
    serde_json::from_str(&body).unwrap()
  }

  async fn create_report(&self, user: &str, title: &str) -> Uuid {
    let (status, body) = self
      .json("POST", "/report", user, json!({ "reportType": "EMS Response", "title": title, "city": "Springfield" }))
      .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    created_id(&body)
  }

  async fn create_template(&self, user: &str, title: &str) -> Uuid {
    let (status, body) = self.json("POST", "/template", user, json!({ "title": title })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    created_id(&body)
  }

  async fn add_part(&self, kind: &str, id: Uuid, title: &str, at: usize) {
    let (status, body) = self
      .json("POST", "/part", "alice", json!({
        "itemType": kind, "itemID": id, "partTitle": title, "partIndex": at
      }))
      .await;
    assert_eq!(status, StatusCode::OK, "{body}");
  }

  async fn report(&self, id: Uuid) -> Value { self.get(&format!("/report?reportID={id}"), "alice").await }
}

/// The id at the end of a `... with ID: <id>` message.
fn created_id(body: &str) -> Uuid {
  Uuid::parse_str(body.rsplit(' ').next().unwrap()).unwrap()
}

fn part_titles(item: &Value) -> Vec<String> {
  item["Parts"].as_array().unwrap().iter().map(|p| p["Title"].as_str().unwrap().to_owned()).collect()
}

const STATION_CSV: &str = "Station,Time\n1,10\n1,20\n2,30\n";

// ─── Items ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_fetch_report() {
  let h = harness().await;
  let id = h.create_report("alice", "Station 4").await;

  let report = h.report(id).await;
  assert_eq!(report["ReportID"], id.to_string());
  assert_eq!(report["Title"], "Station 4");
  assert_eq!(report["OwnedBy"]["UserNickName"], "Alice");
  assert_eq!(report["IsDeleted"], false);
  assert_eq!(report["Parts"], json!([]));
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
  let h = harness().await;
  let (status, _) = h.send("GET", "/reports", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_fields_are_bad_requests() {
  let h = harness().await;
  let (status, body) = h.json("POST", "/report", "alice", json!({ "title": "x" })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body, "Bad Request: reportType is required");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
  let h = harness().await;
  let (status, body) = h
    .json("POST", "/part", "alice", json!({ "itemType": "folder", "itemID": "nope" }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body.starts_with("Bad Request: "), "{body}");
}

#[tokio::test]
async fn unknown_report_is_not_found() {
  let h = harness().await;
  let (status, body) = h.send("GET", &format!("/report?reportID={}", Uuid::new_v4()), Some("alice"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body, "Report not found");
}

#[tokio::test]
async fn sharee_reads_but_cannot_write() {
  let h = harness().await;
  let id = h.create_report("alice", "Shared").await;
  let uri = format!("/report?reportID={id}");

  let (status, _) = h.send("GET", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = h
    .json("PUT", "/share", "alice", json!({
      "itemType": "report", "itemID": id, "sharedUserIDs": ["bob", "alice", "bob"]
    }))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, "Item Shared Successfully");

  let report = h.get(&uri, "bob").await;
  assert_eq!(report["SharedWithIDs"], json!(["bob"]));

  let (status, body) = h
    .json("POST", "/part", "bob", json!({
      "itemType": "report", "itemID": id, "partTitle": "Sneaky", "partIndex": 0
    }))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert!(body.starts_with("Forbidden: "), "{body}");

  let (status, _) = h
    .json("PUT", "/share", "bob", json!({ "itemType": "report", "itemID": id, "sharedUserIDs": ["carol"] }))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listings_resolve_nicknames() {
  let h = harness().await;
  let id = h.create_report("alice", "Mine").await;
  h.json("PUT", "/share", "alice", json!({
    "itemType": "report", "itemID": id, "sharedUserIDs": ["bob", "ghost"]
  }))
  .await;

  let listed = h.get("/reports", "bob").await;
  let listed = listed.as_array().unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0]["ReportID"], id.to_string());
  assert_eq!(listed[0]["ReportType"], "EMS Response");
  assert_eq!(listed[0]["OwnedBy"]["UserNickName"], "Alice");
  assert_eq!(
    listed[0]["SharedWith"],
    json!([
      { "UserID": "bob", "UserNickName": "Bob" },
      { "UserID": "ghost", "UserNickName": "*Error Fetching Nickname*" }
    ])
  );
  assert!(listed[0].get("TemplateID").is_none());
}

#[tokio::test]
async fn soft_delete_and_restore() {
  let h = harness().await;
  let id = h.create_template("alice", "Skeleton").await;

  let (status, body) = h
    .send("DELETE", &format!("/item?itemType=template&itemID={id}"), Some("alice"), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, "Item marked for deletion successfully");

  assert_eq!(h.get("/templates", "alice").await, json!([]));
  let trash = h.get("/templates?deleted=true", "alice").await;
  assert_eq!(trash[0]["TemplateID"], id.to_string());
  let delete_at = trash[0]["DeleteAt"].as_i64().unwrap();
  let modified = trash[0]["LastModifiedAt"].as_i64().unwrap();
  assert_eq!(delete_at - modified, 30 * 86_400);

  let (status, _) = h
    .send("DELETE", &format!("/item?itemType=template&itemID={id}&restore=true"), Some("alice"), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(h.get("/templates", "alice").await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn title_and_global_questions_update() {
  let h = harness().await;
  let id = h.create_report("alice", "Old").await;

  let (status, _) = h
    .json("PUT", "/item/title", "alice", json!({ "itemType": "report", "itemID": id, "title": "New" }))
    .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = h
    .json("PUT", "/item/title", "alice", json!({ "itemType": "report", "itemID": id, "title": "  " }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h
    .json("PUT", "/report/global-questions", "alice", json!({
      "reportID": id,
      "questions": [{ "Label": "dept", "Question": "Department?", "Answer": "Springfield FD" }]
    }))
    .await;
  assert_eq!(status, StatusCode::OK);

  let report = h.report(id).await;
  assert_eq!(report["Title"], "New");
  assert_eq!(report["GlobalQuestions"][0]["Answer"], "Springfield FD");
}

#[tokio::test]
async fn convert_round_trip_blanks_answers() {
  let h = harness().await;
  let id = h.create_report("alice", "Source").await;
  h.add_part("report", id, "Intro", 0).await;
  h.json("POST", "/section", "alice", json!({
    "itemType": "report", "itemID": id, "partIndex": 0, "sectionIndex": 0,
    "sectionTitle": "Overview",
    "questions": [{ "Label": "q1", "Question": "Colour?", "Answer": "red" }],
    "textOutputs": [{ "Title": "t", "Type": "Static", "Input": "**q1", "Result": "red" }]
  }))
  .await;

  let (status, body) = h
    .json("POST", "/convert", "bob", json!({ "itemType": "report", "itemID": id, "title": "Copy" }))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

  let (status, body) = h
    .json("POST", "/convert", "alice", json!({ "itemType": "report", "itemID": id, "title": "Skeleton" }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let template_id = created_id(&body);
  let template = h.get(&format!("/template?templateID={template_id}"), "alice").await;
  assert_eq!(template["Parts"][0]["Sections"][0]["Questions"], json!([{ "Label": "q1", "Question": "Colour?" }]));

  let (status, _) = h
    .json("POST", "/convert", "alice", json!({ "itemType": "template", "itemID": template_id, "title": "Fresh" }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = h
    .json("POST", "/convert", "alice", json!({
      "itemType": "template", "itemID": template_id, "title": "Fresh",
      "reportType": "EMS Response", "city": "Shelbyville"
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let fresh = h.report(created_id(&body)).await;
  assert_eq!(fresh["City"], "Shelbyville");
  let section = &fresh["Parts"][0]["Sections"][0];
  assert_eq!(section["Questions"][0]["Answer"], "");
  assert_eq!(section["TextOutputs"][0]["Result"], "");
  assert_eq!(fresh["CSVID"], "");
}

// ─── Structure ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_move_parts() {
  let h = harness().await;
  let id = h.create_report("alice", "R").await;
  for (at, title) in ["A", "B", "C"].into_iter().enumerate() {
    h.add_part("report", id, title, at).await;
  }
  h.add_part("report", id, "X", 1).await;
  assert_eq!(part_titles(&h.report(id).await), ["A", "X", "B", "C"]);

  let (status, body) = h
    .json("PUT", "/part", "alice", json!({
      "itemType": "report", "itemID": id, "oldPartIndex": 3, "newPartIndex": 0, "partTitle": ""
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let report = h.report(id).await;
  assert_eq!(part_titles(&report), ["C", "A", "X", "B"]);
  let indices: Vec<u64> =
    report["Parts"].as_array().unwrap().iter().map(|p| p["Index"].as_u64().unwrap()).collect();
  assert_eq!(indices, [0, 1, 2, 3]);
}

#[tokio::test]
async fn out_of_range_part_is_rejected() {
  let h = harness().await;
  let id = h.create_template("alice", "T").await;
  let (status, body) = h
    .json("POST", "/part", "alice", json!({
      "itemType": "template", "itemID": id, "partTitle": "Far", "partIndex": 2
    }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body.contains("out of range"), "{body}");
}

#[tokio::test]
async fn section_lifecycle_on_template() {
  let h = harness().await;
  let id = h.create_template("alice", "T").await;
  h.add_part("template", id, "One", 0).await;
  h.add_part("template", id, "Two", 1).await;

  for (at, title) in ["First", "Second"].into_iter().enumerate() {
    let (status, body) = h
      .json("POST", "/section", "alice", json!({
        "itemType": "template", "itemID": id, "partIndex": 0, "sectionIndex": at,
        "sectionTitle": title,
        "questions": [{ "Label": "q1", "Question": "?" }],
        "textOutputs": []
      }))
      .await;
    assert_eq!(status, StatusCode::OK, "{body}");
  }

  let (status, body) = h
    .json("PUT", "/section", "alice", json!({
      "itemType": "template", "itemID": id,
      "oldPartIndex": 0, "newPartIndex": 1, "oldSectionIndex": 0, "newSectionIndex": 0,
      "newSectionTitle": "Moved",
      "questions": [{ "Label": "q2", "Question": "Why?" }],
      "textOutputs": [{ "Title": "t", "Type": "Static", "Input": "**q2" }]
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let template = h.get(&format!("/template?templateID={id}"), "alice").await;
  assert_eq!(template["Parts"][0]["Sections"][0]["Title"], "Second");
  assert_eq!(template["Parts"][0]["Sections"][0]["Index"], 0);
  assert_eq!(template["Parts"][1]["Sections"][0]["Title"], "Moved");
  assert_eq!(template["Parts"][1]["Sections"][0]["Questions"][0]["Label"], "q2");

  let (status, _) = h
    .send(
      "DELETE",
      &format!("/section?itemType=template&itemID={id}&partIndex=1&sectionIndex=0"),
      Some("alice"),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  let template = h.get(&format!("/template?templateID={id}"), "alice").await;
  assert_eq!(template["Parts"][1]["Sections"], json!([]));
}

#[tokio::test]
async fn duplicate_labels_conflict() {
  let h = harness().await;
  let id = h.create_report("alice", "R").await;
  h.add_part("report", id, "P", 0).await;
  let (status, body) = h
    .json("POST", "/section", "alice", json!({
      "itemType": "report", "itemID": id, "partIndex": 0, "sectionIndex": 0,
      "sectionTitle": "S",
      "questions": [{ "Label": "total", "Question": "?" }],
      "csvData": [{ "Label": "total", "OperationType": "NumericalSum", "OperationColumn": "Time" }]
    }))
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body.starts_with("Conflict: "), "{body}");
  assert_eq!(h.report(id).await["Parts"][0]["Sections"], json!([]));
}

#[tokio::test]
async fn templates_refuse_csv_data() {
  let h = harness().await;
  let id = h.create_template("alice", "T").await;
  h.add_part("template", id, "P", 0).await;
  let (status, _) = h
    .json("POST", "/section", "alice", json!({
      "itemType": "template", "itemID": id, "partIndex": 0, "sectionIndex": 0,
      "sectionTitle": "S",
      "csvData": [{ "Label": "n", "OperationType": "Average", "OperationColumn": "Time" }]
    }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Generation ──────────────────────────────────────────────────────────────

/// A report with one part holding `section`.
async fn report_with_section(h: &Harness, section: Value) -> Uuid {
  let id = h.create_report("alice", "R").await;
  h.add_part("report", id, "P", 0).await;
  let mut body = json!({ "itemType": "report", "itemID": id, "partIndex": 0, "sectionIndex": 0 });
  body.as_object_mut().unwrap().extend(section.as_object().unwrap().clone());
  let (status, resp) = h.json("POST", "/section", "alice", body).await;
  assert_eq!(status, StatusCode::OK, "{resp}");
  id
}

#[tokio::test]
async fn generate_static_and_generator_outputs() {
  let h = harness().await;
  let id = report_with_section(&h, json!({
    "sectionTitle": "Colours",
    "questions": [{ "Label": "q1", "Question": "Colour?" }],
    "textOutputs": [
      { "Title": "s", "Type": "Static", "Input": "**q1 is a color. **q10 unused" },
      { "Title": "g", "Type": "Generator", "Input": "Describe **q1" },
      { "Title": "f", "Type": "Generator", "Input": "please fail" }
    ]
  }))
  .await;

  let (status, body) = h
    .json("POST", "/section/generate", "alice", json!({
      "reportID": id, "partIndex": 0, "sectionIndex": 0,
      "answers": [{ "Label": "q1", "Answer": "red" }, { "Label": "nope", "Answer": "x" }],
      "regenGeneratedOutput": false
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let outcome: Value = serde_json::from_str(&body).unwrap();
  assert_eq!(outcome["unresolvedLabels"], json!(["nope"]));
  assert_eq!(outcome["generatorErrors"][0]["outputIndex"], 2);

  let section = &h.report(id).await["Parts"][0]["Sections"][0];
  assert_eq!(section["OutputGenerated"], true);
  assert_eq!(section["Questions"][0]["Answer"], "red");
  assert_eq!(section["TextOutputs"][0]["Result"], "red is a color. **q10 unused");
  assert_eq!(section["TextOutputs"][1]["Result"], "generated: Describe red");
  assert_eq!(section["TextOutputs"][2]["Result"], "");
}

#[tokio::test]
async fn unlabelled_answers_fill_questions_in_order() {
  let h = harness().await;
  let id = report_with_section(&h, json!({
    "sectionTitle": "Crew",
    "questions": [{ "Label": "chief", "Question": "Chief?" }, { "Label": "unit", "Question": "Unit?" }],
    "textOutputs": [{ "Title": "s", "Type": "Static", "Input": "**chief led **unit" }]
  }))
  .await;

  let (status, body) = h
    .json("POST", "/section/generate", "alice", json!({
      "reportID": id, "partIndex": 0, "sectionIndex": 0,
      "answers": [{ "Answer": "Ng" }, { "QuestionIndex": 1, "Answer": "Engine 4" }]
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let section = &h.report(id).await["Parts"][0]["Sections"][0];
  assert_eq!(section["Questions"][1]["Answer"], "Engine 4");
  assert_eq!(section["TextOutputs"][0]["Result"], "Ng led Engine 4");
}

#[tokio::test]
async fn csv_section_without_upload_is_not_found() {
  let h = harness().await;
  let id = report_with_section(&h, json!({
    "sectionTitle": "Times",
    "csvData": [{ "Label": "avg", "OperationType": "Average", "OperationColumn": "Time" }]
  }))
  .await;

  let (status, body) = h
    .json("POST", "/section/generate", "alice", json!({ "reportID": id, "partIndex": 0, "sectionIndex": 0 }))
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body.starts_with("Not Found: "), "{body}");
}

#[tokio::test]
async fn section_responses_bind_without_generating() {
  let h = harness().await;
  let id = report_with_section(&h, json!({
    "sectionTitle": "Times",
    "questions": [{ "Label": "q1", "Question": "?" }],
    "csvData": [{ "Label": "avg", "OperationType": "Average", "OperationColumn": "Time" }]
  }))
  .await;

  let (status, body) = h
    .json("PUT", "/section/responses", "alice", json!({
      "reportID": id, "partIndex": 0, "sectionIndex": 0,
      "answers": [{ "Label": "q1", "Answer": "yes" }],
      "csvDataResponses": [{ "OperationColumn": "Duration", "FilterColumns": { "Station": ["1"] } }],
      "chartOutputResponses": []
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let section = &h.report(id).await["Parts"][0]["Sections"][0];
  assert_eq!(section["Questions"][0]["Answer"], "yes");
  assert_eq!(section["CSVData"][0]["OperationColumn"], "Duration");
  assert_eq!(section["CSVData"][0]["FilterColumns"], json!({ "Station": ["1"] }));
  assert_eq!(section["OutputGenerated"], false);

  let (status, _) = h
    .json("PUT", "/section/responses", "alice", json!({
      "reportID": id, "partIndex": 0, "sectionIndex": 0,
      "csvDataResponses": [{ "OperationColumn": "a" }, { "OperationColumn": "b" }]
    }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── CSV uploads ─────────────────────────────────────────────────────────────

async fn wait_for_operation(h: &Harness, operation_id: &str) {
  for _ in 0..200 {
    let status = h.get(&format!("/operation?operationID={operation_id}"), "alice").await;
    if status["operationCompleted"] == true {
      return;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("operation {operation_id} never completed");
}

#[tokio::test]
async fn upload_index_and_generate_from_csv() {
  let h = harness().await;
  let id = report_with_section(&h, json!({
    "sectionTitle": "Times",
    "textOutputs": [{ "Title": "t", "Type": "Static", "Input": "Average response **avg" }],
    "csvData": [{ "Label": "avg", "OperationType": "Average", "OperationColumn": "Time" }],
    "chartOutputs": [{
      "Title": "By station", "Type": "Bar",
      "IndependentColumnLabel": "Station", "IndependentColumn": "Station",
      "DependentColumns": [{
        "AggregateValueLabel": "Total", "Column": "Time", "OperationType": "NumericalSum"
      }]
    }]
  }))
  .await;

  let (status, body) = h.json("POST", "/csv/upload", "alice", json!({ "reportID": id })).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let ticket: Value = serde_json::from_str(&body).unwrap();
  let operation_id = ticket["operationID"].as_str().unwrap().to_owned();
  let url = ticket["preSignedURL"].as_str().unwrap();
  let path = url.strip_prefix(PUBLIC_URL).unwrap();
  assert!(path.starts_with(&format!("/blobs/reports/{id}/{operation_id}.csv?expires=")), "{path}");

  let status = h.get(&format!("/operation?operationID={operation_id}"), "alice").await;
  assert_eq!(status["operationCompleted"], false);

  let req = Request::builder().method("PUT").uri(path).body(Body::from(STATION_CSV)).unwrap();
  let resp = router(h.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);

  wait_for_operation(&h, &operation_id).await;

  let report = h.report(id).await;
  assert_eq!(report["CSVID"], operation_id);
  assert_eq!(report["CSVColumnsS3Key"], format!("reports/{id}/{operation_id}.columns.json"));

  let columns = h.get(&format!("/csv/columns?reportID={id}"), "alice").await;
  assert_eq!(columns["ColumnsMap"]["Station"], json!(["1", "2"]));

  let (status, body) = h
    .json("POST", "/section/generate", "alice", json!({ "reportID": id, "partIndex": 0, "sectionIndex": 0 }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let section = &h.report(id).await["Parts"][0]["Sections"][0];
  assert_eq!(section["CSVData"][0]["Result"], "20");
  assert_eq!(section["TextOutputs"][0]["Result"], "Average response 20");
  assert_eq!(
    section["ChartOutputs"][0]["Results"],
    json!([{ "Station": "1", "Total": 30 }, { "Station": "2", "Total": 30 }])
  );
}

/// Request an upload for `report_id` as `user` and return the operation id.
async fn request_upload(h: &Harness, report_id: Uuid, user: &str) -> Uuid {
  let (status, body) = h.json("POST", "/csv/upload", user, json!({ "reportID": report_id })).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let ticket: Value = serde_json::from_str(&body).unwrap();
  Uuid::parse_str(ticket["operationID"].as_str().unwrap()).unwrap()
}

/// Upload `csv` into alice's report `report_id` and wait until it is indexed.
async fn upload_csv(h: &Harness, report_id: Uuid, csv: &str) -> Uuid {
  let operation_id = request_upload(h, report_id, "alice").await;
  let status = h.put_blob(&format!("/blobs/reports/{report_id}/{operation_id}.csv"), csv).await;
  assert_eq!(status, StatusCode::OK);
  wait_for_operation(h, &operation_id.to_string()).await;
  operation_id
}

#[tokio::test]
async fn upload_without_pending_operation_is_refused() {
  let h = harness().await;
  let key = format!("reports/{}/{}.csv", Uuid::new_v4(), Uuid::new_v4());
  let future = chrono::Utc::now().timestamp() + 600;

  assert_eq!(h.put_blob(&format!("/blobs/{key}?expires={future}"), STATION_CSV).await, StatusCode::FORBIDDEN);
  assert_eq!(h.put_blob(&format!("/blobs/{key}"), STATION_CSV).await, StatusCode::FORBIDDEN);
  assert!(h.state.blob.get_object(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn upload_cannot_target_another_report() {
  let h = harness().await;
  let alice_report = h.create_report("alice", "Alice's").await;
  let bob_report = h.create_report("bob", "Bob's").await;
  let operation_id = request_upload(&h, bob_report, "bob").await;

  let key = format!("reports/{alice_report}/{operation_id}.csv");
  let status = h.put_blob(&format!("/blobs/{key}?expires=99999999999"), STATION_CSV).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert!(h.state.blob.get_object(&key).await.unwrap().is_none());

  h.state.blob.put_object(&key, STATION_CSV.as_bytes().to_vec(), "text/csv").await.unwrap();
  let (status, _) = h
    .hook("/hooks/csv-uploaded", Some(HOOK_SECRET), json!({
      "Records": [{ "s3": { "object": { "key": key } } }]
    }))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  assert_eq!(h.report(alice_report).await["CSVID"], "");
  let status = h.get(&format!("/operation?operationID={operation_id}"), "bob").await;
  assert_eq!(status["operationCompleted"], false);
}

#[tokio::test]
async fn upload_after_deadline_is_refused() {
  let h = harness().await;
  let id = h.create_report("alice", "R").await;
  let issued = chrono::Utc::now().timestamp() - 3_600;
  let csv_id = Uuid::new_v4();
  h.state
    .store
    .create_operation(Operation::csv_upload(csv_id, id, "alice".into(), issued + 900, issued))
    .await
    .unwrap();

  let future = chrono::Utc::now().timestamp() + 600;
  let status = h.put_blob(&format!("/blobs/reports/{id}/{csv_id}.csv?expires={future}"), STATION_CSV).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert!(h.state.blob.get_object(&format!("reports/{id}/{csv_id}.csv")).await.unwrap().is_none());
  assert_eq!(h.report(id).await["CSVID"], "");
}

#[tokio::test]
async fn failed_aggregate_is_reported_per_output() {
  let h = harness().await;
  let id = report_with_section(&h, json!({
    "sectionTitle": "Times",
    "questions": [{ "Label": "q1", "Question": "Station?" }],
    "textOutputs": [
      { "Title": "s", "Type": "Static", "Input": "**q1 covers **stations stations" },
      { "Title": "g", "Type": "Generator", "Input": "Summarise **total" }
    ],
    "csvData": [
      { "Label": "total", "OperationType": "NumericalSum", "OperationColumn": "Time" },
      { "Label": "mean", "OperationType": "Average", "OperationColumn": "Time" },
      { "Label": "stations", "OperationType": "UniqueOccurrences", "OperationColumn": "Station" }
    ]
  }))
  .await;
  upload_csv(&h, id, "Station,Time\n1,10\n2,ten\n").await;

  let (status, body) = h
    .json("POST", "/section/generate", "alice", json!({
      "reportID": id, "partIndex": 0, "sectionIndex": 0,
      "answers": [{ "Label": "q1", "Answer": "Central" }]
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let outcome: Value = serde_json::from_str(&body).unwrap();
  let failed: Vec<(&str, u64, &str)> = outcome["datasetErrors"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| (f["list"].as_str().unwrap(), f["index"].as_u64().unwrap(), f["name"].as_str().unwrap()))
    .collect();
  assert_eq!(failed, [("CSVData", 0, "total"), ("CSVData", 1, "mean")]);

  let section = &h.report(id).await["Parts"][0]["Sections"][0];
  assert_eq!(section["OutputGenerated"], true);
  assert_eq!(section["CSVData"][0]["Result"], "");
  assert_eq!(section["CSVData"][1]["Result"], "");
  assert_eq!(section["CSVData"][2]["Result"], "2");
  assert_eq!(section["TextOutputs"][0]["Result"], "Central covers 2 stations");
  assert_eq!(section["TextOutputs"][1]["Result"], "generated: Summarise **total");
}

#[tokio::test]
async fn full_report_converts_to_template_and_back() {
  let h = harness().await;
  let id = report_with_section(&h, json!({
    "sectionTitle": "Times",
    "questions": [{ "Label": "q1", "Question": "Station?" }],
    "textOutputs": [{ "Title": "s", "Type": "Static", "Input": "**q1 averaged **avg" }],
    "csvData": [{ "Label": "avg", "OperationType": "Average", "OperationColumn": "Time" }],
    "chartOutputs": [{
      "Title": "By station", "Type": "Bar", "IndependentColumnLabel": "Station", "IndependentColumn": "Station",
      "DependentColumns": [{ "AggregateValueLabel": "Total", "Column": "Time", "OperationType": "NumericalSum" }]
    }]
  }))
  .await;
  h.add_part("report", id, "Appendix", 1).await;
  upload_csv(&h, id, STATION_CSV).await;
  let (status, body) = h
    .json("POST", "/section/generate", "alice", json!({
      "reportID": id, "partIndex": 0, "sectionIndex": 0,
      "answers": [{ "Label": "q1", "Answer": "Central" }]
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let source = h.report(id).await;
  assert_eq!(source["Parts"][0]["Sections"][0]["TextOutputs"][0]["Result"], "Central averaged 20");
  assert_ne!(source["CSVID"], "");

  let (status, body) = h
    .json("POST", "/convert", "alice", json!({ "itemType": "report", "itemID": id, "title": "Skeleton" }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let template_id = created_id(&body);
  let template = h.get(&format!("/template?templateID={template_id}"), "alice").await;
  assert_eq!(part_titles(&template), ["P", "Appendix"]);
  assert!(template["Parts"][0]["Sections"][0].get("CSVData").is_none());

  let (status, body) = h
    .json("POST", "/convert", "alice", json!({
      "itemType": "template", "itemID": template_id, "title": "Next year",
      "reportType": "EMS Response", "city": "Springfield"
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let fresh = h.report(created_id(&body)).await;

  assert_eq!(fresh["CSVID"], "");
  assert_eq!(fresh["CSVColumnsS3Key"], "");
  assert_eq!(part_titles(&fresh), ["P", "Appendix"]);
  let section = &fresh["Parts"][0]["Sections"][0];
  assert_eq!(section["Title"], "Times");
  assert_eq!(section["OutputGenerated"], false);
  assert_eq!(section["Questions"], json!([{ "Label": "q1", "Question": "Station?", "Answer": "" }]));
  assert_eq!(section["TextOutputs"][0]["Input"], "**q1 averaged **avg");
  assert_eq!(section["TextOutputs"][0]["Result"], "");
  assert_eq!(section["CSVData"], json!([]));
  assert_eq!(section["ChartOutputs"], json!([]));
}

#[tokio::test]
async fn s3_event_hook_indexes_upload() {
  let h = harness().await;
  let id = h.create_report("alice", "R").await;
  let (_, body) = h.json("POST", "/csv/upload", "alice", json!({ "reportID": id })).await;
  let ticket: Value = serde_json::from_str(&body).unwrap();
  let operation_id = ticket["operationID"].as_str().unwrap().to_owned();
  let key = format!("reports/{id}/{operation_id}.csv");
  h.state.blob.put_object(&key, STATION_CSV.as_bytes().to_vec(), "text/csv").await.unwrap();

  let (status, body) = h
    .hook("/hooks/csv-uploaded", Some(HOOK_SECRET), json!({
      "Records": [{ "s3": { "bucket": { "name": "b" }, "object": { "key": key, "size": 30 } } }]
    }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let status = h.get(&format!("/operation?operationID={operation_id}"), "alice").await;
  assert_eq!(status["operationCompleted"], true);
  assert_eq!(h.report(id).await["CSVID"], operation_id);
}

#[tokio::test]
async fn unknown_operation_reads_as_incomplete() {
  let h = harness().await;
  let status = h.get(&format!("/operation?operationID={}", Uuid::new_v4()), "alice").await;
  assert_eq!(status, json!({ "operationCompleted": false }));
}

// ─── Users and hooks ─────────────────────────────────────────────────────────

#[tokio::test]
async fn post_confirmation_records_and_returns_event() {
  let h = harness().await;
  let event = json!({
    "version": "1",
    "triggerSource": "PostConfirmation_ConfirmSignUp",
    "userPoolId": "us-east-2_abc",
    "userName": "carol",
    "request": { "userAttributes": { "sub": "sub-carol", "nickname": "Carol" } },
    "response": {}
  });

  let (status, body) = h.hook("/hooks/post-confirmation", Some(HOOK_SECRET), event.clone()).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), event);

  let users = h.get("/users", "alice").await;
  assert!(users.as_array().unwrap().contains(&json!({ "UserID": "sub-carol", "UserNickName": "Carol" })));
}

#[tokio::test]
async fn other_triggers_pass_through() {
  let h = harness().await;
  let event = json!({ "triggerSource": "PostConfirmation_ConfirmForgotPassword", "userName": "dave" });
  let (status, body) = h.hook("/hooks/post-confirmation", Some(HOOK_SECRET), event.clone()).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), event);
  assert_eq!(h.get("/users", "alice").await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn hooks_require_the_shared_secret() {
  let h = harness().await;
  let event = json!({
    "triggerSource": "PostConfirmation_ConfirmSignUp",
    "userName": "mallory",
    "request": { "userAttributes": { "sub": "sub-mallory", "nickname": "Mallory" } }
  });

  let (status, _) = h.hook("/hooks/post-confirmation", None, event.clone()).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = h.hook("/hooks/post-confirmation", Some("guess"), event.clone()).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = h.hook("/hooks/csv-uploaded", Some("guess"), json!({ "Records": [] })).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let open = Harness {
    state: AppState { config: Arc::new(ServerConfig::default()), ..h.state.clone() },
    _dir:  tempfile::tempdir().unwrap(),
  };
  let (status, _) = open.hook("/hooks/post-confirmation", Some(""), event).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  assert_eq!(h.get("/users", "alice").await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn me_and_report_types() {
  let h = harness().await;
  let (status, body) = h.send("GET", "/users/me", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, "alice");

  let (_, body) = h.send("GET", "/report-types", None, None).await;
  assert_eq!(body, "Fire Station Analysis,EMS Response,Community Risk Assessment");
}

#[tokio::test]
async fn responses_carry_cors_headers() {
  let h = harness().await;
  let req = Request::builder()
    .method("GET")
    .uri("/report-types")
    .header(header::ORIGIN, "https://app.example.com")
    .body(Body::empty())
    .unwrap();
  let resp = router(h.state.clone()).oneshot(req).await.unwrap();
  let headers = resp.headers();
  assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
  assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "OPTIONS,POST,GET");
  assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
}
