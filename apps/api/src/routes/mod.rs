pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as predict;
use crate::matching::handlers as jobs;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route("/api/v1/jobs", get(jobs::handle_list_jobs))
        .route("/api/v1/jobs/locations", get(jobs::handle_locations))
        .route("/api/v1/jobs/search", get(jobs::handle_search))
        .route("/api/v1/jobs/match", post(jobs::handle_match))
        // Predict API
        .route("/api/v1/predict", post(predict::handle_predict))
        .route("/api/v1/predict/match", post(predict::handle_predict_and_match))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::analysis::intake::DocumentIntake;
    use crate::analysis::runner::AnalysisRunner;
    use crate::config::{EngineConfig, StagingConfig};
    use crate::corpus::StaticCorpus;
    use crate::models::posting::JobPosting;

    const BOUNDARY: &str = "jobmatch-test-boundary";

    const ENGINE_OK: &str = r#"printf '{"result_category":"Data Scientist","confidence":87,"skills":["Python","SQL"]}'"#;

    fn posting(title: &str, location: &str, experience: &str, skills: &[&str], day: u32) -> JobPosting {
        JobPosting {
            id: Uuid::new_v4(),
            title: title.to_string(),
            company: Some("Acme".to_string()),
            location: location.to_string(),
            experience: Some(experience.to_string()),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            url: None,
            salary: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
        }
    }

    fn corpus() -> Vec<JobPosting> {
        vec![
            posting("Backend Engineer", "Chennai", "2-5 Yrs", &["go", "sql"], 2),
            posting("Data Analyst", "Remote, Chennai", "0-2 Yrs", &["python", "sql"], 1),
        ]
    }

    fn app(dir: &TempDir, engine_script: &str) -> Router {
        let state = AppState {
            corpus: Arc::new(StaticCorpus(corpus())),
            intake: DocumentIntake::new(&StagingConfig {
                dir: dir.path().to_path_buf(),
                retain_uploads: false,
            })
            .unwrap(),
            runner: AnalysisRunner::new(EngineConfig {
                program: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    engine_script.to_string(),
                    "engine".to_string(),
                ],
                timeout: Duration::from_secs(10),
            }),
        };
        build_router(state, 1024 * 1024)
    }

    /// (field name, file name, content)
    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        multipart_to("/api/v1/predict", parts)
    }

    fn multipart_to(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n"
                )),
            }
            body.push_str(&format!("\r\n{content}\r\n"));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn titles(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(&dir, ENGINE_OK), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_predict_without_file_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let request = multipart(&[("title", None, "engineer")]);
        let (status, body) = send(app(&dir, ENGINE_OK), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "NO_FILE_PROVIDED");
    }

    #[tokio::test]
    async fn test_predict_with_empty_file_part_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let request = multipart(&[("resume", Some(""), "")]);
        let (status, body) = send(app(&dir, ENGINE_OK), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "NO_FILE_PROVIDED");
    }

    #[tokio::test]
    async fn test_predict_returns_normalized_prediction() {
        let dir = TempDir::new().unwrap();
        let request = multipart(&[("resume", Some("resume.txt"), "Python and SQL for analytics")]);
        let (status, body) = send(app(&dir, ENGINE_OK), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result_category"], "Data Scientist");
        assert_eq!(body["confidence"], 87.0);
        assert_eq!(body["skills"], json!(["python", "sql"]));
        // Staged upload is cleaned up once the request completes.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_predict_surfaces_engine_stderr() {
        let dir = TempDir::new().unwrap();
        let script = "echo 'spaCy model loading failed' >&2; exit 1";
        let request = multipart(&[("resume", Some("resume.txt"), "text")]);
        let (status, body) = send(app(&dir, script), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "PROCESS_FAILURE");
        assert_eq!(body["error"]["message"], "spaCy model loading failed");
    }

    #[tokio::test]
    async fn test_predict_rejects_malformed_output() {
        let dir = TempDir::new().unwrap();
        let request = multipart(&[("resume", Some("resume.txt"), "text")]);
        let (status, body) = send(app(&dir, "echo 'not json'"), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "MALFORMED_OUTPUT");
    }

    #[tokio::test]
    async fn test_list_jobs_newest_first() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(&dir, ENGINE_OK), get("/api/v1/jobs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["Backend Engineer", "Data Analyst"]);
    }

    #[tokio::test]
    async fn test_locations() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(&dir, ENGINE_OK), get("/api/v1/jobs/locations")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Chennai", "Remote"]));
    }

    #[tokio::test]
    async fn test_search_filters_by_title_and_experience() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            app(&dir, ENGINE_OK),
            get("/api/v1/jobs/search?title=engineer&location=chennai&experience=5"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["Backend Engineer"]);
        assert_eq!(body[0]["match_percentage"], 0.0);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_experience() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            app(&dir, ENGINE_OK),
            get("/api/v1/jobs/search?experience=senior"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_match_ranks_by_prediction() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs/match")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "title": "",
                    "location": "",
                    "experience": "",
                    "prediction": {
                        "result_category": "Data Scientist",
                        "confidence": 87,
                        "skills": ["Python", "SQL"]
                    }
                })
                .to_string(),
            ))
            .unwrap();

        let (status, body) = send(app(&dir, ENGINE_OK), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["Data Analyst", "Backend Engineer"]);
        assert_eq!(body[0]["match_percentage"], 100.0);
        assert_eq!(body[1]["match_percentage"], 50.0);
        assert_eq!(body[1]["skill_match_count"], 1);
    }

    #[tokio::test]
    async fn test_predict_and_match_pipeline() {
        let dir = TempDir::new().unwrap();
        let request = multipart_to(
            "/api/v1/predict/match",
            &[
                ("resume", Some("resume.txt"), "Python, SQL, pandas"),
                ("location", None, "Chennai"),
                ("experience", None, ""),
            ],
        );
        let (status, body) = send(app(&dir, ENGINE_OK), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"]["result_category"], "Data Scientist");
        assert_eq!(
            titles(&body["postings"]),
            vec!["Data Analyst", "Backend Engineer"]
        );
    }

    #[tokio::test]
    async fn test_predict_and_match_validates_before_running_engine() {
        let dir = TempDir::new().unwrap();
        // The engine would fail loudly if it were started.
        let request = multipart_to(
            "/api/v1/predict/match",
            &[
                ("resume", Some("resume.txt"), "text"),
                ("experience", None, "lots"),
            ],
        );
        let (status, body) = send(app(&dir, "echo started >&2; exit 1"), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
